//! In-memory transport for exercising the client without a server.

use super::{Connector, FrameSink, FrameStream};
use crate::types::{RealtimeError, Result};
use async_trait::async_trait;
use futures::channel::mpsc as fmpsc;
use futures::{FutureExt, SinkExt, StreamExt};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, mpsc};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use url::Url;

pub(crate) enum Script {
    Accept,
    Refuse,
    /// Accept once the gate is notified
    AcceptAfter(Arc<Notify>),
    /// Refuse once the gate is notified
    RefuseAfter(Arc<Notify>),
}

/// Server side of one accepted mock connection.
pub(crate) struct MockPeer {
    inbound: fmpsc::UnboundedSender<std::result::Result<Message, WsError>>,
    outbound: fmpsc::UnboundedReceiver<Message>,
}

impl MockPeer {
    pub(crate) fn push_text(&self, text: &str) {
        let _ = self.inbound.unbounded_send(Ok(Message::Text(text.to_string().into())));
    }

    pub(crate) fn push_json(&self, value: serde_json::Value) {
        self.push_text(&value.to_string());
    }

    /// Server-initiated close with an abnormal-termination code.
    pub(crate) fn close_abnormally(&self) {
        let frame = CloseFrame {
            code: CloseCode::Abnormal,
            reason: String::new().into(),
        };
        let _ = self.inbound.unbounded_send(Ok(Message::Close(Some(frame))));
    }

    /// Drops the connection without a close frame.
    pub(crate) fn drop_connection(self) {
        drop(self);
    }

    /// Frames the client has written so far, decoded as JSON. Never waits.
    pub(crate) fn sent(&mut self) -> Vec<serde_json::Value> {
        let mut frames = Vec::new();
        while let Some(Some(message)) = self.outbound.next().now_or_never() {
            if let Message::Text(text) = message
                && let Ok(value) = serde_json::from_str(text.as_str())
            {
                frames.push(value);
            }
        }
        frames
    }

    /// Whether the client has closed its write half.
    pub(crate) fn is_closed_by_client(&mut self) -> bool {
        matches!(self.outbound.next().now_or_never(), Some(None))
    }
}

pub(crate) struct MockConnector {
    script: Mutex<VecDeque<Script>>,
    attempts: AtomicUsize,
    peers: mpsc::UnboundedSender<MockPeer>,
}

impl MockConnector {
    /// Once the script runs out every further attempt is refused.
    pub(crate) fn new(script: Vec<Script>) -> (Arc<Self>, mpsc::UnboundedReceiver<MockPeer>) {
        let (peers, peer_rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            script: Mutex::new(script.into()),
            attempts: AtomicUsize::new(0),
            peers,
        });
        (connector, peer_rx)
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn accept(&self) -> (FrameSink, FrameStream) {
        let (inbound_tx, inbound_rx) = fmpsc::unbounded();
        let (outbound_tx, outbound_rx) = fmpsc::unbounded();
        let _ = self.peers.send(MockPeer {
            inbound: inbound_tx,
            outbound: outbound_rx,
        });

        let sink = outbound_tx.sink_map_err(|_| WsError::ConnectionClosed);
        (Box::pin(sink), Box::pin(inbound_rx))
    }
}

fn refused() -> RealtimeError {
    RealtimeError::Connection("connection refused".to_string())
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, _url: &Url) -> Result<(FrameSink, FrameStream)> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Script::Accept) => Ok(self.accept()),
            Some(Script::AcceptAfter(gate)) => {
                gate.notified().await;
                Ok(self.accept())
            }
            Some(Script::RefuseAfter(gate)) => {
                gate.notified().await;
                Err(refused())
            }
            Some(Script::Refuse) | None => Err(refused()),
        }
    }
}
