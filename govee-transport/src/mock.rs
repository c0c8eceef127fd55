//! In-memory GATT backend for tests
//!
//! `MockConnector` records every connect and write, can be told to fail, and
//! lets a test push notifications as if the light had sent them. Clones share
//! state, so a test keeps one clone and hands the other to the code under test.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::{GattConnector, GattSession, NotificationStream, Uuid};

type Responder = Arc<dyn Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync>;

#[derive(Default)]
struct MockState {
    connect_attempts: usize,
    last_address: Option<String>,
    fail_next_connects: u32,
    deny_permission: bool,
    /// Session id currently considered live (0 = none)
    live_session: u64,
    next_session: u64,
    write_attempts: usize,
    fail_writes_at: Vec<usize>,
    writes: Vec<Vec<u8>>,
    write_targets: Vec<Uuid>,
    subscriptions: Vec<Uuid>,
    disconnects: usize,
    subscribe_delay: Option<Duration>,
    disconnect_delay: Option<Duration>,
    notify_tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
    responder: Option<Responder>,
}

/// Mock connector/device pair
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` connects fail with a transient error
    pub fn fail_next_connects(&self, n: u32) {
        self.state.lock().fail_next_connects = n;
    }

    /// Make every connect fail with `BlePermissionDenied` (not retried)
    pub fn deny_permission(&self, deny: bool) {
        self.state.lock().deny_permission = deny;
    }

    /// Fail the write attempt with this 0-based index (counted across sessions)
    pub fn fail_write_at(&self, index: usize) {
        self.state.lock().fail_writes_at.push(index);
    }

    /// Hold every `subscribe` call for `delay` before it completes
    pub fn subscribe_delay(&self, delay: Duration) {
        self.state.lock().subscribe_delay = Some(delay);
    }

    /// Hold every `disconnect` call for `delay` before it takes effect
    pub fn disconnect_delay(&self, delay: Duration) {
        self.state.lock().disconnect_delay = Some(delay);
    }

    /// Answer writes: whatever `f` returns is delivered as a notification
    pub fn respond_with<F>(&self, f: F)
    where
        F: Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync + 'static,
    {
        self.state.lock().responder = Some(Arc::new(f));
    }

    pub fn connect_attempts(&self) -> usize {
        self.state.lock().connect_attempts
    }

    pub fn last_address(&self) -> Option<String> {
        self.state.lock().last_address.clone()
    }

    /// Successfully written frames, in order
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.lock().writes.clone()
    }

    pub fn write_targets(&self) -> Vec<Uuid> {
        self.state.lock().write_targets.clone()
    }

    pub fn subscriptions(&self) -> Vec<Uuid> {
        self.state.lock().subscriptions.clone()
    }

    pub fn disconnects(&self) -> usize {
        self.state.lock().disconnects
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().live_session != 0
    }

    /// Deliver a notification to the current subscriber.
    ///
    /// Returns false if nobody is listening.
    pub fn notify(&self, bytes: Vec<u8>) -> bool {
        let state = self.state.lock();
        match &state.notify_tx {
            Some(tx) => tx.send(bytes).is_ok(),
            None => false,
        }
    }

    /// Drop the link from the device side: the notification stream ends and
    /// the session reports disconnected.
    pub fn sever(&self) {
        let mut state = self.state.lock();
        state.live_session = 0;
        state.notify_tx = None;
    }
}

#[async_trait]
impl GattConnector for MockConnector {
    async fn connect(&self, address: &str) -> Result<Arc<dyn GattSession>, TransportError> {
        let mut state = self.state.lock();
        state.connect_attempts += 1;
        state.last_address = Some(address.to_string());

        if state.deny_permission {
            return Err(TransportError::BlePermissionDenied(
                "mock: permission denied".into(),
            ));
        }
        if state.fail_next_connects > 0 {
            state.fail_next_connects -= 1;
            return Err(TransportError::Ble("mock: connection refused".into()));
        }

        state.next_session += 1;
        state.live_session = state.next_session;
        Ok(Arc::new(MockSession {
            id: state.next_session,
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockSession {
    id: u64,
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl GattSession for MockSession {
    async fn write_without_response(
        &self,
        characteristic: Uuid,
        data: &[u8],
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.live_session != self.id {
            return Err(TransportError::Disconnected);
        }

        let index = state.write_attempts;
        state.write_attempts += 1;
        if let Some(pos) = state.fail_writes_at.iter().position(|&i| i == index) {
            state.fail_writes_at.swap_remove(pos);
            return Err(TransportError::Ble("mock: write failed".into()));
        }

        state.writes.push(data.to_vec());
        state.write_targets.push(characteristic);

        let reply = state.responder.as_ref().and_then(|respond| respond(data));
        if let (Some(reply), Some(tx)) = (reply, state.notify_tx.as_ref()) {
            let _ = tx.send(reply);
        }
        Ok(())
    }

    async fn subscribe(&self, characteristic: Uuid) -> Result<NotificationStream, TransportError> {
        let delay = self.state.lock().subscribe_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        if state.live_session != self.id {
            return Err(TransportError::Disconnected);
        }
        state.subscriptions.push(characteristic);

        let (tx, rx) = mpsc::unbounded_channel();
        state.notify_tx = Some(tx);
        let notifications = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|bytes| (bytes, rx))
        });
        Ok(Box::pin(notifications))
    }

    async fn is_connected(&self) -> bool {
        self.state.lock().live_session == self.id
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let delay = self.state.lock().disconnect_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        state.disconnects += 1;
        if state.live_session == self.id {
            state.live_session = 0;
            state.notify_tx = None;
        }
        Ok(())
    }
}
