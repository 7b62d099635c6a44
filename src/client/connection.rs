use crate::types::{OutboundMessage, RealtimeError, Result};
use crate::websocket::FrameSink;
use futures::SinkExt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

/// Owns the write half of the current transport and the connection state.
pub struct ConnectionManager {
    ws_write: Arc<RwLock<Option<FrameSink>>>,
    state: Arc<RwLock<ConnectionState>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            ws_write: Arc::new(RwLock::new(None)),
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
        }
    }

    /// Sets the WebSocket write sink (called after successful connection)
    pub async fn set_writer(&self, writer: FrameSink) {
        let mut ws = self.ws_write.write().await;
        *ws = Some(writer);
    }

    /// Gets the current connection state
    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Sets the connection state
    pub async fn set_state(&self, new_state: ConnectionState) {
        let mut state = self.state.write().await;
        *state = new_state;
    }

    /// Checks if currently connected
    pub async fn is_connected(&self) -> bool {
        *self.state.read().await == ConnectionState::Connected
    }

    /// Serializes and writes one frame. Errors when there is no open writer.
    pub async fn send_message(&self, msg: &OutboundMessage) -> Result<()> {
        let json = serde_json::to_string(msg)?;
        let message = Message::Text(json.into());

        let mut ws_guard = self.ws_write.write().await;
        let Some(ws) = ws_guard.as_mut() else {
            return Err(RealtimeError::NotConnected);
        };
        ws.send(message).await?;
        tracing::debug!("Sent {} frame", msg.tag());

        Ok(())
    }

    /// Closes the write half, if any. The caller owns the state transitions.
    pub async fn close_writer(&self) -> Result<()> {
        let mut ws_guard = self.ws_write.write().await;
        let result = match ws_guard.as_mut() {
            Some(ws) => ws.close().await.map_err(RealtimeError::from),
            None => Ok(()),
        };
        *ws_guard = None;
        result
    }

    /// Clears the writer (used when the transport went away on its own)
    pub async fn clear_writer(&self) {
        let mut ws = self.ws_write.write().await;
        *ws = None;
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
