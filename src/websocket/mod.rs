// WebSocket module - Transport seam between the client and the network
mod factory;
#[cfg(test)]
pub(crate) mod mock;

pub use factory::{Connector, FrameSink, FrameStream, WebSocketConnector};
