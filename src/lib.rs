//! # Community Realtime
//!
//! Reconnecting real-time channels for a community web platform: one channel per signed-in
//! user for presence and notifications, one per open chat room for messages, typing and
//! membership.
//!
//! ## Example
//!
//! ```no_run
//! use community_realtime::{ChannelClient, ChannelEndpoint, ChannelScope, LifecycleEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let endpoint = ChannelEndpoint::from_page_url(
//!         "https://forum.example.org/",
//!         ChannelScope::User("17".to_string()),
//!     )?;
//!     let client = ChannelClient::new(endpoint, Default::default());
//!     let mut events = client.lifecycle();
//!
//!     client.connect().await;
//!     while let Ok(event) = events.recv().await {
//!         if event == LifecycleEvent::ConnectionLost {
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod endpoint;
pub mod infrastructure;
pub mod messaging;
pub mod session;
pub mod storage;
pub mod types;
pub mod websocket;

pub use client::{
    ChannelClient, ChannelClientBuilder, ChannelClientOptions, ConnectionState, LifecycleEvent,
};
pub use endpoint::{ChannelEndpoint, ChannelScope};
pub use infrastructure::{Backoff, CollaboratorClient, ReconnectPolicy};
pub use messaging::{InboundKind, MessageDispatcher, UiState};
pub use session::{PageConfig, PageSession};
pub use storage::{ExpiringStore, Theme};
pub use types::{InboundMessage, OutboundMessage, RealtimeError, Result};
