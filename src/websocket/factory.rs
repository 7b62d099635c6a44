use crate::types::{RealtimeError, Result};
use async_trait::async_trait;
use futures::stream::StreamExt;
use futures::{Sink, Stream};
use std::pin::Pin;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use url::Url;

/// Write half of an open transport.
pub type FrameSink = Pin<Box<dyn Sink<Message, Error = WsError> + Send + Sync>>;

/// Read half of an open transport.
pub type FrameStream = Pin<Box<dyn Stream<Item = std::result::Result<Message, WsError>> + Send>>;

/// Opens transports for a channel client.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<(FrameSink, FrameStream)>;
}

/// WebSocket factory for creating WebSocket connections
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &Url) -> Result<(FrameSink, FrameStream)> {
        tracing::debug!("Creating WebSocket connection to: {}", url);
        let (ws_stream, response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| RealtimeError::Connection(format!("handshake with {} failed: {}", url, e)))?;
        tracing::debug!("Handshake completed with status {}", response.status());

        let (write_half, read_half) = ws_stream.split();
        Ok((Box::pin(write_half), Box::pin(read_half)))
    }
}
