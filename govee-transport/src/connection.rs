//! Connection lifecycle for a single device
//!
//! `ConnectionManager` owns the GATT session. It hands out nothing but a
//! connected/disconnected answer; writes go through it and notifications come
//! out of it via the handler registered at construction.
//!
//! ```text
//! Disconnected --ensure_connected ok--> Connected --write error / stream end--> Disconnected
//!      ^                                     |
//!      +-------------- teardown -------------+
//! ```
//!
//! The session is kept warm between writes. Reconnecting per command costs
//! latency and fails more often, so the link is only dropped on transport
//! error or explicit teardown. Nothing reconnects in the background: the next
//! `ensure_connected` call does.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::error::TransportError;
use crate::frame::Frame;
use crate::protocol::{gatt, timing};
use crate::{GattConnector, GattSession};

/// Receives every raw notification payload from the read characteristic
pub type NotificationHandler = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Link state as seen from above the manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Bounded exponential backoff for connection establishment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total connect attempts, including the first
    pub max_attempts: u32,
    /// Wait after the first failure
    pub initial_backoff: Duration,
    /// Cap for the doubled wait
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: timing::CONNECT_ATTEMPTS,
            initial_backoff: Duration::from_millis(timing::INITIAL_BACKOFF_MS),
            max_backoff: Duration::from_millis(timing::MAX_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    /// Wait before the next attempt, after `failed_attempts` failures (1-based)
    pub fn backoff(&self, failed_attempts: u32) -> Duration {
        let factor = 1u32
            .checked_shl(failed_attempts.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// State shared with the notification reader task.
///
/// `generation` identifies the session a reader belongs to, so a reader from
/// a replaced session can't mark the new one disconnected.
struct LinkStatus {
    state: ConnectionState,
    generation: u64,
}

struct ActiveSession {
    session: Arc<dyn GattSession>,
    reader: JoinHandle<()>,
}

impl ActiveSession {
    async fn close(self, address: &str) {
        self.reader.abort();
        if let Err(e) = self.session.disconnect().await {
            debug!("Disconnect from {} failed: {}", address, e);
        }
    }
}

/// Owns the transport session for one device address
pub struct ConnectionManager {
    connector: Arc<dyn GattConnector>,
    address: String,
    policy: RetryPolicy,
    handler: NotificationHandler,
    /// Serializes connect/write/teardown on the session
    session: tokio::sync::Mutex<Option<ActiveSession>>,
    link: Arc<Mutex<LinkStatus>>,
    /// Bumped by `teardown` to abort an in-progress connect loop
    cancel_tx: watch::Sender<u64>,
}

impl ConnectionManager {
    /// Create a manager for `address`. No connection is made until
    /// [`ensure_connected`](Self::ensure_connected).
    pub fn new(
        connector: Arc<dyn GattConnector>,
        address: impl Into<String>,
        policy: RetryPolicy,
        handler: NotificationHandler,
    ) -> Self {
        let (cancel_tx, _) = watch::channel(0);
        Self {
            connector,
            address: address.into(),
            policy,
            handler,
            session: tokio::sync::Mutex::new(None),
            link: Arc::new(Mutex::new(LinkStatus {
                state: ConnectionState::Disconnected,
                generation: 0,
            })),
            cancel_tx,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn state(&self) -> ConnectionState {
        self.link.lock().state
    }

    /// Whether a session is up and usable for writes
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Reuse the live session, or connect with retry/backoff.
    ///
    /// Returns `ConnectFailed` once the retry budget is spent (or immediately
    /// on a non-transient error), and `Cancelled` if [`teardown`](Self::teardown)
    /// interrupts the loop.
    pub async fn ensure_connected(&self) -> Result<(), TransportError> {
        // Subscribe before locking so a teardown that lands while we wait is seen
        let mut cancel = self.cancel_tx.subscribe();
        let mut slot = self.session.lock().await;

        if let Some(active) = slot.as_ref() {
            if self.is_connected() {
                let live = tokio::select! {
                    biased;
                    _ = cancel.changed() => return Err(self.cancelled()),
                    live = active.session.is_connected() => live,
                };
                if live {
                    return Ok(());
                }
            }
            debug!("Session to {} is stale, reconnecting", self.address);
        }
        if let Some(stale) = slot.take() {
            // Detached so the disconnect completes even if we are cancelled
            let address = self.address.clone();
            let closing = tokio::spawn(async move { stale.close(&address).await });
            tokio::select! {
                biased;
                _ = cancel.changed() => return Err(self.cancelled()),
                _ = closing => {}
            }
        }

        *slot = Some(self.connect_with_retry(&mut cancel).await?);
        Ok(())
    }

    /// Write one frame to the write characteristic (no acknowledgment).
    ///
    /// A failed write marks the link severed so the next
    /// `ensure_connected` opens a new session.
    pub async fn write(&self, frame: &Frame) -> Result<(), TransportError> {
        let session = {
            let slot = self.session.lock().await;
            slot.as_ref().map(|active| Arc::clone(&active.session))
        }
        .ok_or(TransportError::Disconnected)?;

        debug!("BLE write to {}: {:02X?}", self.address, frame.as_slice());
        if let Err(e) = session
            .write_without_response(gatt::WRITE_CHARACTERISTIC, frame.as_slice())
            .await
        {
            warn!("BLE write to {} failed: {}", self.address, e);
            self.set_state(ConnectionState::Disconnected);
            return Err(e);
        }
        Ok(())
    }

    /// Abort any connect loop in progress, stop notifications and release
    /// the session.
    pub async fn teardown(&self) {
        self.cancel_tx
            .send_modify(|epoch| *epoch = epoch.wrapping_add(1));

        let mut slot = self.session.lock().await;
        if let Some(active) = slot.take() {
            active.close(&self.address).await;
            info!("Disconnected from {}", self.address);
        }
        self.set_state(ConnectionState::Disconnected);
    }

    // ---- Connect sequence ----

    async fn connect_with_retry(
        &self,
        cancel: &mut watch::Receiver<u64>,
    ) -> Result<ActiveSession, TransportError> {
        self.set_state(ConnectionState::Connecting);

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            debug!(
                "Connecting to {} (attempt {}/{})",
                self.address, attempt, self.policy.max_attempts
            );

            let result = self.connect_once(cancel).await;

            let err = match result {
                Ok(active) => {
                    info!("Connected to {} after {} attempt(s)", self.address, attempt);
                    return Ok(active);
                }
                Err(e) => e,
            };

            if matches!(err, TransportError::Cancelled) {
                return Err(self.cancelled());
            }

            if !err.is_transient() || attempt >= self.policy.max_attempts {
                warn!(
                    "Giving up on {} after {} attempt(s): {}",
                    self.address, attempt, err
                );
                self.set_state(ConnectionState::Disconnected);
                return Err(TransportError::ConnectFailed {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            let delay = self.policy.backoff(attempt);
            warn!(
                "Connect attempt {}/{} to {} failed: {} - retrying in {:?}",
                attempt, self.policy.max_attempts, self.address, err, delay
            );
            tokio::select! {
                biased;
                _ = cancel.changed() => return Err(self.cancelled()),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// One connect + subscribe, spawning the notification reader on success.
    ///
    /// Once `connect` has handed back a session, every failure path including
    /// cancellation disconnects it before returning.
    async fn connect_once(
        &self,
        cancel: &mut watch::Receiver<u64>,
    ) -> Result<ActiveSession, TransportError> {
        let session = tokio::select! {
            biased;
            _ = cancel.changed() => return Err(TransportError::Cancelled),
            result = self.connector.connect(&self.address) => result?,
        };

        let subscribed = tokio::select! {
            biased;
            _ = cancel.changed() => Err(TransportError::Cancelled),
            result = session.subscribe(gatt::READ_CHARACTERISTIC) => result,
        };
        let mut notifications = match subscribed {
            Ok(stream) => stream,
            Err(e) => {
                if let Err(disconnect_err) = session.disconnect().await {
                    debug!("Disconnect from {} failed: {}", self.address, disconnect_err);
                }
                return Err(e);
            }
        };

        let generation = {
            let mut link = self.link.lock();
            link.generation = link.generation.wrapping_add(1);
            link.state = ConnectionState::Connected;
            link.generation
        };

        let handler = Arc::clone(&self.handler);
        let link = Arc::clone(&self.link);
        let address = self.address.clone();
        let reader = tokio::spawn(async move {
            while let Some(payload) = notifications.next().await {
                trace!("BLE notify from {}: {:02X?}", address, payload);
                handler(payload.as_slice());
            }
            let mut link = link.lock();
            if link.generation == generation {
                link.state = ConnectionState::Disconnected;
            }
            debug!("Notification stream from {} ended", address);
        });

        Ok(ActiveSession { session, reader })
    }

    fn set_state(&self, state: ConnectionState) {
        self.link.lock().state = state;
    }

    fn cancelled(&self) -> TransportError {
        info!("Connect to {} cancelled", self.address);
        self.set_state(ConnectionState::Disconnected);
        TransportError::Cancelled
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(active) = self.session.get_mut().take() {
            active.reader.abort();
            debug!("ConnectionManager for {} dropped with live session", self.address);
        }
    }
}
