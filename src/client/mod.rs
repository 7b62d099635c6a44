// Module declarations
mod builder;
mod connection;
mod core;
mod state;
mod typing;


// Public API exports
pub use builder::{ChannelClientBuilder, ChannelClientOptions};
pub use connection::{ConnectionManager, ConnectionState};
pub use self::core::ChannelClient;
pub use state::{ClientState, LifecycleEvent};
