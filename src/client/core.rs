use super::{
    ChannelClientBuilder, ChannelClientOptions, ClientState, ConnectionManager, ConnectionState,
    LifecycleEvent,
};
use crate::endpoint::ChannelEndpoint;
use crate::infrastructure::{HeartbeatManager, ReconnectPolicy, TaskKind};
use crate::messaging::MessageDispatcher;
use crate::types::{OutboundMessage, RealtimeError, Result};
use crate::websocket::Connector;
use futures::stream::StreamExt;
use futures::SinkExt;
use std::sync::{Arc, Weak};
use tokio::sync::{RwLock, broadcast};
use tokio_tungstenite::tungstenite::Message;

/// A reconnecting real-time channel scoped to one user or one chat room.
///
/// `ChannelClient` owns the transport for its endpoint, keeps it alive with a heartbeat,
/// re-establishes it after unclean closes according to its [`ReconnectPolicy`], and feeds
/// every inbound frame to its [`MessageDispatcher`] in arrival order.
///
/// Clones share the same connection.
///
/// # Example
///
/// ```no_run
/// use community_realtime::{ChannelClient, ChannelEndpoint, ChannelScope, OutboundMessage};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let endpoint = ChannelEndpoint::from_page_url(
///     "https://forum.example.org/chat/42/",
///     ChannelScope::Room("42".to_string()),
/// )?;
/// let client = ChannelClient::new(endpoint, Default::default());
///
/// client.connect().await;
/// client.send(OutboundMessage::chat("hello")).await;
/// client.close().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ChannelClient {
    pub(crate) endpoint: ChannelEndpoint,
    pub(crate) options: ChannelClientOptions,
    pub(crate) policy: ReconnectPolicy,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) dispatcher: Arc<MessageDispatcher>,

    // Connection manager
    pub(crate) connection: Arc<ConnectionManager>,

    // Consolidated mutable state
    pub(crate) state: Arc<RwLock<ClientState>>,

    pub(crate) events: broadcast::Sender<LifecycleEvent>,
}

/// Non-owning handle used by the reconnection watcher.
pub(crate) struct WeakChannelClient {
    endpoint: ChannelEndpoint,
    options: ChannelClientOptions,
    policy: ReconnectPolicy,
    connector: Arc<dyn Connector>,
    dispatcher: Arc<MessageDispatcher>,
    connection: Weak<ConnectionManager>,
    state: Weak<RwLock<ClientState>>,
    events: broadcast::Sender<LifecycleEvent>,
}

impl WeakChannelClient {
    pub(crate) fn upgrade(&self) -> Option<ChannelClient> {
        Some(ChannelClient {
            endpoint: self.endpoint.clone(),
            options: self.options.clone(),
            policy: self.policy.clone(),
            connector: Arc::clone(&self.connector),
            dispatcher: Arc::clone(&self.dispatcher),
            connection: self.connection.upgrade()?,
            state: self.state.upgrade()?,
            events: self.events.clone(),
        })
    }
}

impl ChannelClient {
    /// Creates a client over a real WebSocket transport with no message routes.
    ///
    /// No connection is made until [`connect()`](Self::connect).
    pub fn new(endpoint: ChannelEndpoint, options: ChannelClientOptions) -> Self {
        ChannelClientBuilder::new(endpoint, options).build()
    }

    pub fn builder(endpoint: ChannelEndpoint) -> ChannelClientBuilder {
        ChannelClientBuilder::new(endpoint, ChannelClientOptions::default())
    }

    pub(crate) fn downgrade(&self) -> WeakChannelClient {
        WeakChannelClient {
            endpoint: self.endpoint.clone(),
            options: self.options.clone(),
            policy: self.policy.clone(),
            connector: Arc::clone(&self.connector),
            dispatcher: Arc::clone(&self.dispatcher),
            connection: Arc::downgrade(&self.connection),
            state: Arc::downgrade(&self.state),
            events: self.events.clone(),
        }
    }

    pub fn endpoint(&self) -> &ChannelEndpoint {
        &self.endpoint
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Subscribes to connection lifecycle notifications.
    pub fn lifecycle(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self) -> ConnectionState {
        self.connection.state().await
    }

    /// Returns `true` if the transport is open.
    pub async fn is_connected(&self) -> bool {
        self.connection.is_connected().await
    }

    /// Reconnects scheduled since the last successful connect.
    pub async fn reconnect_attempts(&self) -> u32 {
        self.state.read().await.reconnect_attempts
    }

    /// Whether the reconnect budget ran out.
    pub async fn is_connection_lost(&self) -> bool {
        self.state.read().await.connection_lost
    }

    pub async fn heartbeat_active(&self) -> bool {
        self.state
            .read()
            .await
            .task_manager
            .is_active(TaskKind::Heartbeat)
    }

    pub async fn reconnect_pending(&self) -> bool {
        self.state
            .read()
            .await
            .task_manager
            .is_active(TaskKind::Reconnect)
    }

    fn emit(&self, event: LifecycleEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    /// Set connection state and notify watchers while the client state is held
    async fn set_state_locked(&self, state: &ClientState, new_state: ConnectionState) {
        self.connection.set_state(new_state).await;
        state.notify_state_change(new_state);
    }

    /// Opens the channel.
    ///
    /// This is also the explicit way back after the reconnect budget ran out: it clears
    /// the terminal state and starts with a fresh attempt counter. Failure to open is
    /// handled here and hands over to the reconnection policy; it is never returned to
    /// the caller. Returns immediately if already connected or connecting.
    pub async fn connect(&self) {
        {
            let state = self.connection.state().await;
            if state == ConnectionState::Connected || state == ConnectionState::Connecting {
                return;
            }
        }

        {
            let mut state = self.state.write().await;
            state.was_manual_disconnect = false;
            state.connection_lost = false;
            state.reconnect_attempts = 0;
            state.task_manager.abort(TaskKind::Reconnect);
        }

        if let Err(e) = self.open_session().await {
            tracing::warn!("Could not open {}: {}", self.endpoint, e);
        }
    }

    /// Tears the current connection down and opens a fresh one.
    pub async fn reconnect(&self) {
        self.close().await;
        self.connect().await;
    }

    /// One connection attempt. On failure the state goes back to Disconnected, which the
    /// watcher turns into a scheduled reconnect.
    async fn open_session(&self) -> Result<()> {
        let attempt_id = {
            let mut state = self.state.write().await;

            // close() may have run after this attempt was scheduled
            if state.was_manual_disconnect {
                tracing::debug!("Not opening {}: closed by caller", self.endpoint);
                return Ok(());
            }
            let current = self.connection.state().await;
            if current == ConnectionState::Connected || current == ConnectionState::Connecting {
                return Ok(());
            }

            let attempt_id = state.begin_open();
            self.set_state_locked(&state, ConnectionState::Connecting)
                .await;
            attempt_id
        };
        self.emit(LifecycleEvent::Connecting);

        let url = self.endpoint.url();
        tracing::info!("Connecting to {}", url);

        let (mut write_half, mut read_half) = match self.connector.connect(url).await {
            Ok(halves) => halves,
            Err(e) => {
                let state = self.state.read().await;
                // A close() in the meantime already settled the state
                if state.open_attempt != attempt_id {
                    return Err(e);
                }
                self.set_state_locked(&state, ConnectionState::Disconnected)
                    .await;
                self.emit(LifecycleEvent::Disconnected { clean: false });
                return Err(e);
            }
        };

        let mut state = self.state.write().await;

        // Closed while the handshake was in flight
        if state.open_attempt != attempt_id {
            drop(state);
            tracing::debug!("Discarding connection opened after close()");
            let _ = write_half.close().await;
            return Ok(());
        }

        self.connection.set_writer(write_half).await;
        let session_id = state.begin_session();
        state.reconnect_attempts = 0;
        state.connection_lost = false;

        let reader_client = self.clone();
        let dispatcher = Arc::clone(&self.dispatcher);
        state.task_manager.spawn(TaskKind::Reader, async move {
            tracing::debug!("Starting read task for session {}", session_id);
            let reason = loop {
                match read_half.next().await {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received text frame: {}", text.as_str());
                        dispatcher.dispatch_frame(text.as_str());
                    }
                    Some(Ok(Message::Close(frame))) => {
                        break match frame {
                            Some(close_frame) => format!(
                                "server closed connection: code={}, reason='{}'",
                                u16::from(close_frame.code),
                                close_frame.reason.as_str()
                            ),
                            None => "server closed connection without close frame".to_string(),
                        };
                    }
                    Some(Ok(Message::Ping(data))) => {
                        tracing::debug!("Received ping ({} bytes)", data.len());
                    }
                    Some(Ok(Message::Pong(data))) => {
                        tracing::debug!("Received pong ({} bytes)", data.len());
                    }
                    Some(Ok(Message::Binary(data))) => {
                        tracing::warn!("Ignoring binary frame ({} bytes)", data.len());
                    }
                    Some(Ok(Message::Frame(_))) => {
                        tracing::debug!("Received raw frame (internal)");
                    }
                    Some(Err(e)) => {
                        tracing::error!("WebSocket read error: {}", e);
                        break format!("read error: {}", e);
                    }
                    None => break "transport stream ended".to_string(),
                }
            };
            reader_client
                .handle_transport_closed(session_id, &reason)
                .await;
        });

        self.set_state_locked(&state, ConnectionState::Connected)
            .await;

        HeartbeatManager::new(Arc::downgrade(&self.connection))
            .with_interval(self.options.heartbeat_interval())
            .spawn_on(&mut state.task_manager);

        self.emit(LifecycleEvent::Connected);
        tracing::info!("Connected to {}", self.endpoint);
        Ok(())
    }

    /// Called by a session's reader when its transport goes away.
    async fn handle_transport_closed(&self, session_id: u64, reason: &str) {
        let mut state = self.state.write().await;

        if state.active_session != Some(session_id) {
            tracing::debug!("Ignoring close of stale session {}", session_id);
            return;
        }
        if self.connection.state().await == ConnectionState::Closing {
            return;
        }

        state.active_session = None;
        state.typing_active = false;
        state.task_manager.abort(TaskKind::Heartbeat);
        state.task_manager.abort(TaskKind::TypingStop);
        state.task_manager.detach(TaskKind::Reader);
        self.connection.clear_writer().await;

        tracing::warn!("Channel {} closed uncleanly: {}", self.endpoint, reason);
        self.set_state_locked(&state, ConnectionState::Disconnected)
            .await;
        self.emit(LifecycleEvent::Disconnected { clean: false });
    }

    /// Applies the reconnection policy after an unclean close or a failed open.
    pub(crate) async fn schedule_reconnect(&self) {
        let mut state = self.state.write().await;

        if state.was_manual_disconnect || state.connection_lost {
            return;
        }
        if state.task_manager.is_active(TaskKind::Reconnect) {
            return;
        }
        if self.connection.state().await != ConnectionState::Disconnected {
            return;
        }

        let attempt = state.reconnect_attempts + 1;
        let Some(delay) = self.policy.delay_for(attempt) else {
            state.connection_lost = true;
            tracing::warn!(
                "Giving up on {} after {} reconnect attempts",
                self.endpoint,
                state.reconnect_attempts
            );
            self.emit(LifecycleEvent::ConnectionLost);
            return;
        };

        state.reconnect_attempts = attempt;
        tracing::info!(
            "Reconnecting to {} in {}ms (attempt {})",
            self.endpoint,
            delay.as_millis(),
            attempt
        );
        self.emit(LifecycleEvent::ReconnectScheduled { attempt, delay });

        let client = self.clone();
        state.task_manager.spawn(TaskKind::Reconnect, async move {
            tokio::time::sleep(delay).await;
            {
                let mut state = client.state.write().await;
                // From here on a failure must be able to schedule the next attempt
                state.task_manager.detach(TaskKind::Reconnect);
                if state.was_manual_disconnect {
                    return;
                }
            }

            tracing::info!("Attempting to reconnect...");
            if let Err(e) = client.open_session().await {
                tracing::error!("Reconnection attempt {} failed: {}", attempt, e);
            }
        });
    }

    /// Gracefully closes the channel.
    ///
    /// Cancels the heartbeat, any pending reconnect and the typing timer before the
    /// transport is closed, and marks the close as manual so no reconnect follows.
    /// Safe to call in any state.
    pub async fn close(&self) {
        let mut state = self.state.write().await;
        state.was_manual_disconnect = true;
        state.cancel_open();
        state.active_session = None;
        state.typing_active = false;
        state.task_manager.abort_all();

        if self.connection.state().await == ConnectionState::Disconnected {
            state.notify_state_change(ConnectionState::Disconnected);
            return;
        }

        tracing::info!("Closing {}", self.endpoint);
        self.set_state_locked(&state, ConnectionState::Closing)
            .await;

        if let Err(e) = self.connection.close_writer().await {
            tracing::debug!("Error while closing transport: {}", e);
        }

        self.set_state_locked(&state, ConnectionState::Disconnected)
            .await;
        self.emit(LifecycleEvent::Disconnected { clean: true });
        tracing::info!("Closed {}", self.endpoint);
    }

    /// Push a message to the server
    pub(crate) async fn push(&self, message: &OutboundMessage) -> Result<()> {
        if !self.is_connected().await {
            return Err(RealtimeError::NotConnected);
        }

        self.connection.send_message(message).await
    }

    /// Best-effort send. When the channel is not connected the frame is dropped with a
    /// warning and the call still returns normally.
    pub async fn send(&self, message: OutboundMessage) {
        if let Err(e) = self.push(&message).await {
            tracing::warn!(
                "Dropping {} frame for {}: {}",
                message.tag(),
                self.endpoint,
                e
            );
        }
    }

    pub async fn send_chat(&self, content: impl Into<String>, reply_to: Option<String>) {
        let message = OutboundMessage::ChatMessage {
            content: content.into(),
            reply_to,
        };
        self.send(message).await;
    }

    pub async fn update_status(&self, status: impl Into<String>) {
        self.send(OutboundMessage::status(status)).await;
    }

    pub async fn mark_read(&self) {
        self.send(OutboundMessage::MarkRead).await;
    }
}
