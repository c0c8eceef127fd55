//! Transport and framing error types

use thiserror::Error;
use uuid::Uuid;

/// Errors produced while encoding or decoding a 20-byte frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Payload too long: {got} bytes (max {max})")]
    PayloadTooLong { max: usize, got: usize },

    #[error("Invalid frame length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },

    /// Transmission corrupted: the trailing byte doesn't match the XOR fold
    #[error("Checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },
}

/// Errors that can occur during transport operations
#[derive(Error, Debug)]
pub enum TransportError {
    // Common errors
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Device disconnected")]
    Disconnected,

    #[error("GATT characteristic not found: {0}")]
    CharacteristicNotFound(Uuid),

    #[error("Connection failed after {attempts} attempt(s): {last}")]
    ConnectFailed {
        attempts: u32,
        last: Box<TransportError>,
    },

    #[error("Connection attempt cancelled")]
    Cancelled,

    // BLE-specific errors
    #[error("Bluetooth error: {0}")]
    Ble(String),

    #[error("Bluetooth permission denied: {0}")]
    BlePermissionDenied(String),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    // Generic
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TransportError {
    /// Whether a connect attempt failing with this error is worth retrying.
    ///
    /// Covers the usual BLE flakiness: device not advertising yet, a previous
    /// session not released by the stack, link dropped mid-setup.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportError::DeviceNotFound(_) | TransportError::Disconnected | TransportError::Ble(_)
        )
    }
}

#[cfg(feature = "bluetooth")]
impl From<btleplug::Error> for TransportError {
    fn from(e: btleplug::Error) -> Self {
        match e {
            btleplug::Error::DeviceNotFound => TransportError::DeviceNotFound(e.to_string()),
            btleplug::Error::NotConnected => TransportError::Disconnected,
            btleplug::Error::PermissionDenied => TransportError::BlePermissionDenied(e.to_string()),
            other => TransportError::Ble(other.to_string()),
        }
    }
}
