// Infrastructure module - Background services and collaborator plumbing
pub mod heartbeat;
pub mod http;
pub mod reconnect;
pub mod task_manager;

pub use heartbeat::HeartbeatManager;
pub use http::{
    Attachment, CollaboratorClient, FileMessage, MessageSent, NotificationSettings, RoomCreated,
};
pub use reconnect::{Backoff, ReconnectPolicy};
pub use task_manager::{TaskKind, TaskManager};
