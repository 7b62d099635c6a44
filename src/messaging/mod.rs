// Messaging module - Inbound frame decoding, dispatch and UI-facing consumers
pub mod dispatcher;
pub mod event;
pub mod handlers;

pub use dispatcher::{Decoded, DispatchOutcome, MessageDispatcher};
pub use event::InboundKind;
pub use handlers::{NotificationEntry, Toast, ToastQueue, UiSnapshot, UiState};
