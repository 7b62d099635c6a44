use crate::types::constants::{
    ROOM_RECONNECT_INTERVAL, USER_MAX_RECONNECT_ATTEMPTS, USER_RECONNECT_BASE,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    /// `attempt x base_interval`
    Linear,
    /// Always `base_interval`
    Fixed,
}

/// Reconnection schedule after an unclean close or a failed open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    pub base_interval_ms: u64,
    pub backoff: Backoff,
    /// `None` retries forever
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl ReconnectPolicy {
    /// Linear growth from 5 s, giving up after 5 attempts.
    pub fn user_channel() -> Self {
        Self {
            base_interval_ms: USER_RECONNECT_BASE,
            backoff: Backoff::Linear,
            max_attempts: Some(USER_MAX_RECONNECT_ATTEMPTS),
        }
    }

    /// Fixed 3 s retry with no cap.
    pub fn room_channel() -> Self {
        Self {
            base_interval_ms: ROOM_RECONNECT_INTERVAL,
            backoff: Backoff::Fixed,
            max_attempts: None,
        }
    }

    pub fn base_interval(&self) -> Duration {
        Duration::from_millis(self.base_interval_ms)
    }

    /// Delay before the given 1-based attempt, or `None` once the budget is spent.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        let attempt = attempt.max(1);
        if self.max_attempts.is_some_and(|max| attempt > max) {
            return None;
        }

        let millis = match self.backoff {
            Backoff::Linear => self.base_interval_ms.saturating_mul(u64::from(attempt)),
            Backoff::Fixed => self.base_interval_ms,
        };
        Some(Duration::from_millis(millis))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::user_channel()
    }
}
