//! State change notification

use crate::state::DeviceState;

/// Called once per decoded response, after the cached state is updated.
///
/// Runs on the notification reader task: keep it short and don't block.
pub trait StateObserver: Send + Sync {
    fn on_state_changed(&self, state: &DeviceState);
}

impl<F> StateObserver for F
where
    F: Fn(&DeviceState) + Send + Sync,
{
    fn on_state_changed(&self, state: &DeviceState) {
        self(state)
    }
}
