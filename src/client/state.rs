use super::connection::ConnectionState;
use crate::infrastructure::TaskManager;
use std::time::Duration;
use tokio::sync::watch;

/// Connection lifecycle notifications for the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Connecting,
    Connected,
    Disconnected { clean: bool },
    ReconnectScheduled { attempt: u32, delay: Duration },
    /// Reconnect budget exhausted; no further attempts until an explicit connect
    ConnectionLost,
}

/// Consolidated mutable state for a ChannelClient
/// Using a single struct reduces lock contention
pub struct ClientState {
    /// Reconnects scheduled since the last successful connect
    pub reconnect_attempts: u32,

    /// Whether the disconnect was manual (prevents auto-reconnect)
    pub was_manual_disconnect: bool,

    /// Set once the reconnect budget is spent
    pub connection_lost: bool,

    /// Id of the session whose reader currently owns the transport
    pub active_session: Option<u64>,

    /// Last session id handed out
    pub session_counter: u64,

    /// Id of the newest connection attempt; a handshake finishing under an older id is stale
    pub open_attempt: u64,

    /// Whether a `typing: true` frame is outstanding
    pub typing_active: bool,

    /// Background task manager
    pub task_manager: TaskManager,

    /// Sender for state change notifications
    pub state_change_tx: Option<watch::Sender<(ConnectionState, bool)>>,
}

impl ClientState {
    pub fn new() -> Self {
        Self {
            reconnect_attempts: 0,
            was_manual_disconnect: false,
            connection_lost: false,
            active_session: None,
            session_counter: 0,
            open_attempt: 0,
            typing_active: false,
            task_manager: TaskManager::new(),
            state_change_tx: None,
        }
    }

    /// Hand out the id for a new session and mark it active
    pub fn begin_session(&mut self) -> u64 {
        self.session_counter += 1;
        self.active_session = Some(self.session_counter);
        self.session_counter
    }

    /// Start a connection attempt and return its id
    pub fn begin_open(&mut self) -> u64 {
        self.open_attempt += 1;
        self.open_attempt
    }

    /// Invalidate any handshake still in flight
    pub fn cancel_open(&mut self) {
        self.open_attempt += 1;
    }

    /// Notify state change watchers
    pub fn notify_state_change(&self, state: ConnectionState) {
        if let Some(tx) = &self.state_change_tx
            && tx.send((state, self.was_manual_disconnect)).is_err()
        {
            tracing::debug!(
                "State change watcher disconnected, could not notify state: {:?}",
                state
            );
        }
    }
}

impl Default for ClientState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sessions_get_fresh_ids() {
        let mut state = ClientState::new();
        let first = state.begin_session();
        let second = state.begin_session();

        assert_ne!(first, second);
        assert_eq!(state.active_session, Some(second));
    }

    #[test]
    fn test_cancel_open_invalidates_attempt() {
        let mut state = ClientState::new();
        let attempt = state.begin_open();
        state.cancel_open();

        assert_ne!(state.open_attempt, attempt);
        assert_ne!(state.begin_open(), attempt);
    }

    #[test]
    fn test_notify_carries_manual_flag() {
        let (tx, rx) = watch::channel((ConnectionState::Disconnected, false));
        let mut state = ClientState::new();
        state.state_change_tx = Some(tx);
        state.was_manual_disconnect = true;

        state.notify_state_change(ConnectionState::Closing);

        assert_eq!(*rx.borrow(), (ConnectionState::Closing, true));
    }
}
