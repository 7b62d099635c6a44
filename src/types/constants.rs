/// Inbound frame tags (magic strings layer)
pub mod inbound_tags {
    pub const USER_STATUS: &str = "user_status";
    pub const NOTIFICATION: &str = "notification";
    pub const CHAT_MESSAGE: &str = "chat_message";
    pub const TYPING_INDICATOR: &str = "typing_indicator";
    pub const USER_JOINED: &str = "user_joined";
    pub const USER_LEFT: &str = "user_left";
    pub const MESSAGE_REACTION: &str = "message_reaction";
    pub const ERROR: &str = "error";
    pub const NEW_MESSAGE_NOTIFICATION: &str = "new_message_notification";
}

/// Endpoint path segments
pub mod paths {
    pub const USER_CHANNEL: &str = "ws/user";
    pub const ROOM_CHANNEL: &str = "ws/chat";
}

/// Heartbeat interval (milliseconds)
pub const HEARTBEAT_INTERVAL: u64 = 30000;

/// Typing flag is cleared after this much idle time (milliseconds)
pub const TYPING_TIMEOUT: u64 = 3000;

/// User-scoped channel backoff base (milliseconds)
pub const USER_RECONNECT_BASE: u64 = 5000;

/// User-scoped channel attempt cap
pub const USER_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Room-scoped channel fixed retry interval (milliseconds)
pub const ROOM_RECONNECT_INTERVAL: u64 = 3000;

/// Capacity of the lifecycle event broadcast
pub const LIFECYCLE_CHANNEL_CAPACITY: usize = 64;

/// Header carrying the cross-site request forgery token
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Storage key for the theme preference
pub const THEME_KEY: &str = "theme";
