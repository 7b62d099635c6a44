use super::{TaskKind, TaskManager};
use crate::client::ConnectionManager;
use crate::types::OutboundMessage;
use crate::types::constants::HEARTBEAT_INTERVAL;
use std::sync::Weak;
use std::time::Duration;
use tokio::time::{self, Instant};

/// Periodic liveness ping, owned by exactly one connected session.
pub struct HeartbeatManager {
    interval: Duration,
    connection: Weak<ConnectionManager>,
}

impl HeartbeatManager {
    pub fn new(connection: Weak<ConnectionManager>) -> Self {
        Self {
            interval: Duration::from_millis(HEARTBEAT_INTERVAL),
            connection,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Spawns the heartbeat into `tasks`, replacing any previous heartbeat.
    pub fn spawn_on(self, tasks: &mut TaskManager) {
        tasks.spawn(TaskKind::Heartbeat, self.run());
    }

    async fn run(self) {
        // First ping one full interval after connect
        let mut interval_timer = time::interval_at(Instant::now() + self.interval, self.interval);
        interval_timer.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

        loop {
            interval_timer.tick().await;

            let Some(connection) = self.connection.upgrade() else {
                // Client dropped, exit heartbeat task
                break;
            };

            if !connection.is_connected().await {
                tracing::debug!("Skipping heartbeat, connection is not open");
                continue;
            }

            match connection.send_message(&OutboundMessage::heartbeat_now()).await {
                Ok(()) => tracing::debug!("Sent heartbeat"),
                Err(e) => tracing::error!("[Heartbeat] Failed to send: {}", e),
            }
        }
    }
}
