//! UI-facing consumers of dispatched messages.
//!
//! These hold the state a page renders from: who is online, who is typing, the
//! notification feed, the chat transcript, and transient toasts.

use super::{InboundKind, MessageDispatcher};
use crate::client::LifecycleEvent;
use crate::types::{ChatMessage, EntityId, InboundMessage, NotificationLevel, RealtimeError};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

pub const CONNECTION_LOST_NOTICE: &str =
    "Connection lost. Real-time updates are paused until you reconnect.";

/// A transient, non-blocking notice.
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub level: NotificationLevel,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ToastQueue {
    pending: Mutex<VecDeque<Toast>>,
}

impl ToastQueue {
    pub fn push(&self, level: NotificationLevel, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("Toast ({:?}): {}", level, message);
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Toast { level, message });
    }

    /// Surfaces a failed collaborator call.
    pub fn report(&self, error: &RealtimeError) {
        self.push(NotificationLevel::Error, error.to_string());
    }

    pub fn drain(&self) -> Vec<Toast> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationEntry {
    pub title: String,
    pub message: String,
    pub level: NotificationLevel,
}

/// Renderable state derived from inbound frames.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiSnapshot {
    pub online: HashMap<EntityId, bool>,
    pub room_members: BTreeSet<String>,
    pub typing: BTreeSet<String>,
    pub notifications: Vec<NotificationEntry>,
    pub unread_notifications: u32,
    pub transcript: Vec<ChatMessage>,
    pub reactions: HashMap<EntityId, Map<String, Value>>,
    pub room_unread: HashMap<EntityId, u32>,
    pub connection_notice: Option<String>,
}

#[derive(Debug, Default)]
pub struct UiState {
    snapshot: RwLock<UiSnapshot>,
    toasts: ToastQueue,
}

impl UiState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Installs a handler for every inbound kind into `dispatcher`.
    pub fn register(self: &Arc<Self>, dispatcher: &mut MessageDispatcher) {
        for kind in InboundKind::ALL {
            let state = Arc::clone(self);
            dispatcher.register(kind, move |message| state.apply(message));
        }
    }

    pub fn snapshot(&self) -> UiSnapshot {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn toasts(&self) -> &ToastQueue {
        &self.toasts
    }

    /// Forgets what belongs to the room the page is leaving. Presence, the
    /// notification feed and per-room unread counts outlive the room.
    pub fn clear_room(&self) {
        let mut ui = self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        ui.transcript.clear();
        ui.typing.clear();
        ui.room_members.clear();
        ui.reactions.clear();
    }

    pub fn apply(&self, message: &InboundMessage) {
        let mut ui = self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        match message {
            InboundMessage::UserStatus { user_id, is_online } => {
                ui.online.insert(user_id.clone(), *is_online);
            }
            InboundMessage::Notification {
                title,
                message,
                level,
                unread_count,
            } => {
                ui.notifications.push(NotificationEntry {
                    title: title.clone(),
                    message: message.clone(),
                    level: *level,
                });
                ui.unread_notifications = *unread_count;
                drop(ui);
                self.toasts.push(*level, title.clone());
            }
            InboundMessage::ChatMessage { message } => {
                match ui.transcript.iter_mut().find(|m| m.id == message.id) {
                    Some(existing) => *existing = message.clone(),
                    None => ui.transcript.push(message.clone()),
                }
                ui.typing.remove(&message.sender.name);
            }
            InboundMessage::TypingIndicator {
                is_typing,
                username,
            } => {
                if *is_typing {
                    ui.typing.insert(username.clone());
                } else {
                    ui.typing.remove(username);
                }
            }
            InboundMessage::UserJoined { username, .. } => {
                ui.room_members.insert(username.clone());
            }
            InboundMessage::UserLeft { username, .. } => {
                ui.room_members.remove(username);
                ui.typing.remove(username);
            }
            InboundMessage::MessageReaction {
                message_id,
                details,
            } => {
                ui.reactions.insert(message_id.clone(), details.clone());
            }
            InboundMessage::Error { message } => {
                drop(ui);
                self.toasts.push(NotificationLevel::Error, message.clone());
            }
            InboundMessage::NewMessageNotification {
                room_id,
                unread_count,
                ..
            } => {
                ui.room_unread.insert(room_id.clone(), *unread_count);
            }
        }
    }

    /// Reflects connection lifecycle in the visible notice.
    pub fn observe(&self, event: &LifecycleEvent) {
        let mut ui = self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match event {
            LifecycleEvent::ConnectionLost => {
                ui.connection_notice = Some(CONNECTION_LOST_NOTICE.to_string());
            }
            LifecycleEvent::Connected => {
                ui.connection_notice = None;
            }
            _ => {}
        }
    }

    /// Forwards lifecycle events into this state until the sender goes away.
    pub fn follow(self: &Arc<Self>, mut events: broadcast::Receiver<LifecycleEvent>) -> JoinHandle<()> {
        let state = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => state.observe(&event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("UI lifecycle follower lagged by {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
