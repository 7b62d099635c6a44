use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::messaging::InboundKind;

/// Identifier of a user, room or message.
///
/// The server emits numeric ids on some pages and UUID strings on others, so both
/// decode into the same string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawId")]
pub struct EntityId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl From<RawId> for EntityId {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => Self(s),
            RawId::Number(n) => Self(n.to_string()),
        }
    }
}

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Warning,
    Error,
    /// Also used for levels this client does not know
    #[default]
    #[serde(other)]
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sender {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyReference {
    pub id: EntityId,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub sender: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: EntityId,
    pub sender: Sender,
    pub content: String,
    #[serde(default)]
    pub reply_to: Option<ReplyReference>,
    pub created_at: String,
}

/// Frames received from the server, keyed by their `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    UserStatus {
        user_id: EntityId,
        is_online: bool,
    },
    Notification {
        title: String,
        message: String,
        #[serde(default)]
        level: NotificationLevel,
        #[serde(default)]
        unread_count: u32,
    },
    ChatMessage {
        message: ChatMessage,
    },
    TypingIndicator {
        is_typing: bool,
        username: String,
    },
    UserJoined {
        username: String,
        #[serde(default)]
        action: String,
    },
    UserLeft {
        username: String,
        #[serde(default)]
        action: String,
    },
    MessageReaction {
        message_id: EntityId,
        #[serde(flatten)]
        details: Map<String, Value>,
    },
    Error {
        message: String,
    },
    NewMessageNotification {
        room_id: EntityId,
        #[serde(default)]
        message: Value,
        #[serde(default)]
        sender: Value,
        #[serde(default)]
        unread_count: u32,
        #[serde(default)]
        timestamp: Option<String>,
    },
}

impl InboundMessage {
    pub fn kind(&self) -> InboundKind {
        match self {
            Self::UserStatus { .. } => InboundKind::UserStatus,
            Self::Notification { .. } => InboundKind::Notification,
            Self::ChatMessage { .. } => InboundKind::ChatMessage,
            Self::TypingIndicator { .. } => InboundKind::TypingIndicator,
            Self::UserJoined { .. } => InboundKind::UserJoined,
            Self::UserLeft { .. } => InboundKind::UserLeft,
            Self::MessageReaction { .. } => InboundKind::MessageReaction,
            Self::Error { .. } => InboundKind::Error,
            Self::NewMessageNotification { .. } => InboundKind::NewMessageNotification,
        }
    }
}

/// Frames constructed locally and sent to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Typing {
        is_typing: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        room_id: Option<String>,
    },
    StatusUpdate {
        status: String,
    },
    Heartbeat {
        timestamp: i64,
    },
    ChatMessage {
        content: String,
        reply_to: Option<String>,
    },
    MarkRead,
    UserActivity,
}

impl OutboundMessage {
    pub fn heartbeat_now() -> Self {
        Self::Heartbeat {
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn chat(content: impl Into<String>) -> Self {
        Self::ChatMessage {
            content: content.into(),
            reply_to: None,
        }
    }

    /// Attaches a reply reference; no-op for anything but a chat message.
    pub fn with_reply_to(mut self, message_id: impl Into<String>) -> Self {
        if let Self::ChatMessage { reply_to, .. } = &mut self {
            *reply_to = Some(message_id.into());
        }
        self
    }

    pub fn status(status: impl Into<String>) -> Self {
        Self::StatusUpdate {
            status: status.into(),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Typing { .. } => "typing",
            Self::StatusUpdate { .. } => "status_update",
            Self::Heartbeat { .. } => "heartbeat",
            Self::ChatMessage { .. } => "chat_message",
            Self::MarkRead => "mark_read",
            Self::UserActivity => "user_activity",
        }
    }
}
