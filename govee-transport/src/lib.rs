//! Transport layer for Govee Bluetooth LE lights
//!
//! This crate provides the pieces that talk to the wire:
//!
//! - [`frame`]: the 20-byte frame codec with XOR checksum
//! - [`GattConnector`] / [`GattSession`]: the GATT client boundary
//! - [`ConnectionManager`]: keeps one warm session per device, reconnects
//!   with bounded exponential backoff, routes notifications to a handler
//! - `bluetooth` (feature): btleplug backend
//! - `mock` (feature): in-memory backend for tests

pub mod connection;
pub mod error;
pub mod frame;
pub mod protocol;

#[cfg(feature = "bluetooth")]
pub mod bluetooth;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use connection::{ConnectionManager, ConnectionState, NotificationHandler, RetryPolicy};
pub use error::{FrameError, TransportError};
pub use frame::{decode, encode, ColorMode, Frame, LogicalPacket, PacketCmd, PacketHead};
pub use uuid::Uuid;

#[cfg(feature = "bluetooth")]
pub use bluetooth::BtleplugConnector;

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;

/// Stream of raw notification payloads from the read characteristic
pub type NotificationStream = Pin<Box<dyn Stream<Item = Vec<u8>> + Send>>;

/// An established GATT session with one device
///
/// Sessions are created by a [`GattConnector`] and owned by the
/// [`ConnectionManager`]; nothing above the manager holds one.
#[async_trait]
pub trait GattSession: Send + Sync {
    /// Write `data` to `characteristic` without soliciting an acknowledgment
    async fn write_without_response(
        &self,
        characteristic: Uuid,
        data: &[u8],
    ) -> Result<(), TransportError>;

    /// Enable notifications on `characteristic` and return their payloads.
    ///
    /// The stream ends when the link is severed.
    async fn subscribe(&self, characteristic: Uuid) -> Result<NotificationStream, TransportError>;

    /// Check if the link is still up
    async fn is_connected(&self) -> bool;

    /// Close the session gracefully
    async fn disconnect(&self) -> Result<(), TransportError>;
}

/// Something that can open a [`GattSession`] to a device address
#[async_trait]
pub trait GattConnector: Send + Sync {
    /// Open a fresh session to `address` (single attempt, no retry)
    async fn connect(&self, address: &str) -> Result<Arc<dyn GattSession>, TransportError>;
}
