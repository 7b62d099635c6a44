use super::core::WeakChannelClient;
use super::{ChannelClient, ClientState, ConnectionManager, ConnectionState};
use crate::endpoint::ChannelEndpoint;
use crate::infrastructure::ReconnectPolicy;
use crate::messaging::MessageDispatcher;
use crate::types::constants::{HEARTBEAT_INTERVAL, LIFECYCLE_CHANNEL_CAPACITY, TYPING_TIMEOUT};
use crate::websocket::{Connector, WebSocketConnector};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, broadcast, watch};

/// Tunables for one channel client. Durations are in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChannelClientOptions {
    pub heartbeat_interval: Option<u64>,
    pub typing_timeout: Option<u64>,
    /// Overrides the preset chosen from the endpoint scope
    pub reconnect: Option<ReconnectPolicy>,
}

impl ChannelClientOptions {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval.unwrap_or(HEARTBEAT_INTERVAL))
    }

    pub fn typing_timeout(&self) -> Duration {
        Duration::from_millis(self.typing_timeout.unwrap_or(TYPING_TIMEOUT))
    }
}

/// Builder for ChannelClient that handles initialization
pub struct ChannelClientBuilder {
    endpoint: ChannelEndpoint,
    options: ChannelClientOptions,
    connector: Arc<dyn Connector>,
    dispatcher: MessageDispatcher,
}

impl ChannelClientBuilder {
    /// Create a new builder
    pub fn new(endpoint: ChannelEndpoint, options: ChannelClientOptions) -> Self {
        Self {
            endpoint,
            options,
            connector: Arc::new(WebSocketConnector),
            dispatcher: MessageDispatcher::new(),
        }
    }

    /// Replace the transport used to open connections
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    /// Routes for inbound frames
    pub fn dispatcher(mut self, dispatcher: MessageDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Build the client and spawn the reconnection watcher.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> ChannelClient {
        let mut client_state = ClientState::new();

        // Initialize state watcher channel
        let (state_tx, state_rx) = watch::channel((ConnectionState::Disconnected, false));
        client_state.state_change_tx = Some(state_tx);

        let (events, _) = broadcast::channel(LIFECYCLE_CHANNEL_CAPACITY);

        let policy = self
            .options
            .reconnect
            .clone()
            .unwrap_or_else(|| self.endpoint.scope().default_policy());

        let client = ChannelClient {
            endpoint: self.endpoint,
            options: self.options,
            policy,
            connector: self.connector,
            dispatcher: Arc::new(self.dispatcher),
            connection: Arc::new(ConnectionManager::new()),
            state: Arc::new(RwLock::new(client_state)),
            events,
        };

        // The watcher only holds a weak handle so dropping every client ends it
        tokio::spawn(watch_for_disconnects(client.downgrade(), state_rx));

        client
    }
}

async fn watch_for_disconnects(
    client: WeakChannelClient,
    mut rx: watch::Receiver<(ConnectionState, bool)>,
) {
    while rx.changed().await.is_ok() {
        let (state, was_manual) = *rx.borrow_and_update();

        // Reconnect if disconnected AND not manual
        if state == ConnectionState::Disconnected && !was_manual {
            let Some(client) = client.upgrade() else {
                break;
            };
            tracing::debug!("State watcher detected disconnect on {}", client.endpoint());
            client.schedule_reconnect().await;
        }
    }
    tracing::debug!("Reconnection watcher task finished");
}
