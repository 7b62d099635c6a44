use crate::types::constants::inbound_tags;

/// Discriminant of an inbound frame, used as the dispatch table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InboundKind {
    UserStatus,
    Notification,
    ChatMessage,
    TypingIndicator,
    UserJoined,
    UserLeft,
    MessageReaction,
    Error,
    NewMessageNotification,
}

impl InboundKind {
    pub const ALL: [InboundKind; 9] = [
        Self::UserStatus,
        Self::Notification,
        Self::ChatMessage,
        Self::TypingIndicator,
        Self::UserJoined,
        Self::UserLeft,
        Self::MessageReaction,
        Self::Error,
        Self::NewMessageNotification,
    ];

    /// Parse a wire tag. Returns `None` for tags this client does not understand.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            inbound_tags::USER_STATUS => Some(Self::UserStatus),
            inbound_tags::NOTIFICATION => Some(Self::Notification),
            inbound_tags::CHAT_MESSAGE => Some(Self::ChatMessage),
            inbound_tags::TYPING_INDICATOR => Some(Self::TypingIndicator),
            inbound_tags::USER_JOINED => Some(Self::UserJoined),
            inbound_tags::USER_LEFT => Some(Self::UserLeft),
            inbound_tags::MESSAGE_REACTION => Some(Self::MessageReaction),
            inbound_tags::ERROR => Some(Self::Error),
            inbound_tags::NEW_MESSAGE_NOTIFICATION => Some(Self::NewMessageNotification),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserStatus => inbound_tags::USER_STATUS,
            Self::Notification => inbound_tags::NOTIFICATION,
            Self::ChatMessage => inbound_tags::CHAT_MESSAGE,
            Self::TypingIndicator => inbound_tags::TYPING_INDICATOR,
            Self::UserJoined => inbound_tags::USER_JOINED,
            Self::UserLeft => inbound_tags::USER_LEFT,
            Self::MessageReaction => inbound_tags::MESSAGE_REACTION,
            Self::Error => inbound_tags::ERROR,
            Self::NewMessageNotification => inbound_tags::NEW_MESSAGE_NOTIFICATION,
        }
    }
}

impl std::fmt::Display for InboundKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
