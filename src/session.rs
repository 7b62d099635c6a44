use crate::client::{ChannelClient, ChannelClientBuilder, ChannelClientOptions};
use crate::endpoint::{ChannelEndpoint, ChannelScope};
use crate::infrastructure::CollaboratorClient;
use crate::messaging::{MessageDispatcher, UiState};
use crate::storage::ExpiringStore;
use crate::types::Result;
use crate::websocket::{Connector, WebSocketConnector};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// What a page knows when it starts up.
#[derive(Debug, Clone, Deserialize)]
pub struct PageConfig {
    /// URL the page was served from; decides `ws` vs `wss` and the API base
    pub page_url: String,
    /// Signed-in user. Anonymous pages get no user channel.
    #[serde(default)]
    pub user_id: Option<String>,
    pub csrf_token: String,
    /// File backing the client store; in memory when absent
    #[serde(default)]
    pub store_path: Option<PathBuf>,
    #[serde(default)]
    pub options: ChannelClientOptions,
}

/// The per-page set of services: user channel, at most one room channel, the
/// collaborator HTTP client and the client store, all sharing one [`UiState`].
pub struct PageSession {
    config: PageConfig,
    connector: Arc<dyn Connector>,
    ui: Arc<UiState>,
    collaborator: CollaboratorClient,
    store: Arc<ExpiringStore>,
    user_channel: Option<FollowedChannel>,
    room_channel: tokio::sync::Mutex<Option<FollowedChannel>>,
}

/// A channel plus the task mirroring its lifecycle into the UI state.
struct FollowedChannel {
    client: ChannelClient,
    follower: JoinHandle<()>,
}

impl FollowedChannel {
    async fn close(self) {
        self.client.close().await;
        self.follower.abort();
    }
}

impl PageSession {
    /// Builds every service for the page and opens the user channel.
    pub async fn bootstrap(config: PageConfig) -> Result<Self> {
        Self::bootstrap_with(config, Arc::new(WebSocketConnector)).await
    }

    pub async fn bootstrap_with(config: PageConfig, connector: Arc<dyn Connector>) -> Result<Self> {
        let collaborator = CollaboratorClient::for_page(&config.page_url, config.csrf_token.clone())?;
        let store = match &config.store_path {
            Some(path) => ExpiringStore::open(path)?,
            None => ExpiringStore::in_memory(),
        };

        let user_endpoint = config
            .user_id
            .as_ref()
            .map(|id| ChannelEndpoint::from_page_url(&config.page_url, ChannelScope::User(id.clone())))
            .transpose()?;

        let mut session = Self {
            config,
            connector,
            ui: UiState::new(),
            collaborator,
            store: Arc::new(store),
            user_channel: None,
            room_channel: tokio::sync::Mutex::new(None),
        };

        if let Some(endpoint) = user_endpoint {
            let channel = session.build_channel(endpoint);
            channel.client.connect().await;
            session.user_channel = Some(channel);
        }

        tracing::info!("Page session ready for {}", session.config.page_url);
        Ok(session)
    }

    fn build_channel(&self, endpoint: ChannelEndpoint) -> FollowedChannel {
        let mut dispatcher = MessageDispatcher::new();
        self.ui.register(&mut dispatcher);

        let client = ChannelClientBuilder::new(endpoint, self.config.options.clone())
            .connector(Arc::clone(&self.connector))
            .dispatcher(dispatcher)
            .build();

        let follower = self.ui.follow(client.lifecycle());
        FollowedChannel { client, follower }
    }

    pub fn ui(&self) -> &Arc<UiState> {
        &self.ui
    }

    pub fn collaborator(&self) -> &CollaboratorClient {
        &self.collaborator
    }

    pub fn store(&self) -> &Arc<ExpiringStore> {
        &self.store
    }

    pub fn user_channel(&self) -> Option<&ChannelClient> {
        self.user_channel.as_ref().map(|channel| &channel.client)
    }

    pub async fn room_channel(&self) -> Option<ChannelClient> {
        self.room_channel
            .lock()
            .await
            .as_ref()
            .map(|channel| channel.client.clone())
    }

    /// Joins a chat room. The page holds one room channel at a time: opening the
    /// room that is already open returns it, opening another closes the old one first
    /// and clears what the page showed for it.
    pub async fn open_room(&self, room_id: &str) -> Result<ChannelClient> {
        let endpoint = ChannelEndpoint::from_page_url(
            &self.config.page_url,
            ChannelScope::Room(room_id.to_string()),
        )?;
        let mut current = self.room_channel.lock().await;

        if let Some(existing) = current.as_ref()
            && existing.client.endpoint() == &endpoint
        {
            return Ok(existing.client.clone());
        }
        if let Some(previous) = current.take() {
            tracing::info!("Leaving room channel {}", previous.client.endpoint());
            previous.close().await;
        }
        self.ui.clear_room();

        let channel = self.build_channel(endpoint);
        channel.client.connect().await;
        let client = channel.client.clone();
        *current = Some(channel);
        Ok(client)
    }

    pub async fn leave_room(&self) {
        if let Some(channel) = self.room_channel.lock().await.take() {
            channel.close().await;
            self.ui.clear_room();
        }
    }

    /// Turns a collaborator failure into a toast and hands back the success value.
    pub fn surface<T>(&self, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.ui.toasts().report(&e);
                None
            }
        }
    }

    /// Closes every channel and writes the store out.
    pub async fn teardown(self) -> Result<()> {
        self.leave_room().await;
        if let Some(channel) = self.user_channel {
            channel.close().await;
        }

        self.store.flush()?;
        tracing::info!("Page session for {} torn down", self.config.page_url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ConnectionState, LifecycleEvent};
    use crate::types::RealtimeError;
    use crate::websocket::mock::{MockConnector, Script};
    use serde_json::json;
    use std::time::Duration;

    fn config(user_id: Option<&str>) -> PageConfig {
        PageConfig {
            page_url: "https://forum.example.org/chat/".to_string(),
            user_id: user_id.map(str::to_string),
            csrf_token: "tok3n".to_string(),
            store_path: None,
            options: ChannelClientOptions::default(),
        }
    }

    #[test]
    fn test_page_config_deserialize() {
        let config: PageConfig = serde_json::from_value(json!({
            "page_url": "http://localhost:8000/",
            "csrf_token": "abc",
            "options": {"typing_timeout": 1500}
        }))
        .unwrap();

        assert_eq!(config.user_id, None);
        assert_eq!(config.store_path, None);
        assert_eq!(config.options.typing_timeout, Some(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bootstrap_opens_user_channel() {
        let (connector, mut peers) = MockConnector::new(vec![Script::Accept]);
        let session = PageSession::bootstrap_with(config(Some("7")), connector.clone())
            .await
            .unwrap();

        let user = session.user_channel().unwrap();
        assert_eq!(user.endpoint().url().as_str(), "wss://forum.example.org/ws/user/7/");
        assert!(user.is_connected().await);

        let peer = peers.try_recv().unwrap();
        peer.push_json(json!({"type": "user_status", "user_id": "9", "is_online": true}));
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(session.ui().snapshot().online.len(), 1);

        session.teardown().await.unwrap();
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_anonymous_page_has_no_user_channel() {
        let (connector, _peers) = MockConnector::new(vec![]);
        let session = PageSession::bootstrap_with(config(None), connector.clone())
            .await
            .unwrap();

        assert!(session.user_channel().is_none());
        assert_eq!(connector.attempts(), 0);
        session.teardown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_room_channel_at_a_time() {
        let (connector, mut peers) =
            MockConnector::new(vec![Script::Accept, Script::Accept]);
        let session = PageSession::bootstrap_with(config(None), connector.clone())
            .await
            .unwrap();

        let first = session.open_room("a").await.unwrap();
        let again = session.open_room("a").await.unwrap();
        assert_eq!(connector.attempts(), 1);
        assert!(again.is_connected().await);
        let mut first_peer = peers.try_recv().unwrap();

        let second = session.open_room("b").await.unwrap();
        assert_eq!(connector.attempts(), 2);
        assert_eq!(first.state().await, ConnectionState::Disconnected);
        assert!(first_peer.is_closed_by_client());
        assert!(second.is_connected().await);
        assert_eq!(
            session.room_channel().await.unwrap().endpoint().room_id(),
            Some("b")
        );

        let _second_peer = peers.try_recv().unwrap();
        session.teardown().await.unwrap();
        assert_eq!(second.state().await, ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_rooms_clears_room_state() {
        let (connector, mut peers) =
            MockConnector::new(vec![Script::Accept, Script::Accept]);
        let session = PageSession::bootstrap_with(config(None), connector)
            .await
            .unwrap();

        session.open_room("a").await.unwrap();
        let first_peer = peers.try_recv().unwrap();
        first_peer.push_json(json!({
            "type": "chat_message",
            "message": {
                "id": "m1",
                "sender": {"id": 1, "name": "ada"},
                "content": "hello a",
                "created_at": "2024-05-01T10:00:00Z"
            }
        }));
        first_peer.push_json(json!({"type": "typing_indicator", "is_typing": true, "username": "bo"}));
        first_peer.push_json(json!({"type": "user_joined", "username": "cy", "action": "joined"}));
        tokio::time::sleep(Duration::from_millis(1)).await;

        let ui = session.ui().snapshot();
        assert_eq!(ui.transcript.len(), 1);
        assert!(ui.typing.contains("bo"));
        assert!(ui.room_members.contains("cy"));

        session.open_room("b").await.unwrap();
        let ui = session.ui().snapshot();
        assert!(ui.transcript.is_empty());
        assert!(ui.typing.is_empty());
        assert!(ui.room_members.is_empty());

        let second_peer = peers.try_recv().unwrap();
        second_peer.push_json(json!({"type": "user_joined", "username": "dee", "action": "joined"}));
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(
            session.ui().snapshot().room_members.iter().collect::<Vec<_>>(),
            vec!["dee"]
        );

        session.leave_room().await;
        assert!(session.ui().snapshot().room_members.is_empty());
        session.teardown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_rooms_stops_old_follower() {
        let (connector, _peers) =
            MockConnector::new(vec![Script::Accept, Script::Accept, Script::Accept]);
        let session = PageSession::bootstrap_with(config(None), connector)
            .await
            .unwrap();

        // Kept alive so its lifecycle channel stays open
        let _first = session.open_room("a").await.unwrap();
        let first_follower = session
            .room_channel
            .lock()
            .await
            .as_ref()
            .unwrap()
            .follower
            .abort_handle();

        let _second = session.open_room("b").await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(first_follower.is_finished());

        let second_follower = session
            .room_channel
            .lock()
            .await
            .as_ref()
            .unwrap()
            .follower
            .abort_handle();
        assert!(!second_follower.is_finished());

        session.open_room("b").await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(!second_follower.is_finished());

        session.teardown().await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(second_follower.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_lost_reaches_ui_notice() {
        let mut page = config(Some("7"));
        page.options.reconnect = Some(crate::infrastructure::ReconnectPolicy {
            base_interval_ms: 10,
            backoff: crate::infrastructure::Backoff::Fixed,
            max_attempts: Some(1),
        });
        let (connector, mut peers) = MockConnector::new(vec![Script::Accept]);
        let session = PageSession::bootstrap_with(page, connector).await.unwrap();
        let mut events = session.user_channel().unwrap().lifecycle();

        peers.try_recv().unwrap().drop_connection();
        loop {
            let event = tokio::time::timeout(Duration::from_secs(60), events.recv())
                .await
                .unwrap()
                .unwrap();
            if event == LifecycleEvent::ConnectionLost {
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert!(session.ui().snapshot().connection_notice.is_some());
        session.teardown().await.unwrap();
    }

    #[tokio::test]
    async fn test_surface_reports_failures_as_toasts() {
        let (connector, _peers) = MockConnector::new(vec![]);
        let session = PageSession::bootstrap_with(config(None), connector).await.unwrap();

        let failed: Result<()> = Err(RealtimeError::Collaborator {
            status: 403,
            message: "Access denied".to_string(),
        });
        assert_eq!(session.surface(failed), None);
        assert_eq!(session.surface(Ok(5)), Some(5));
        assert_eq!(session.ui().toasts().len(), 1);

        session.teardown().await.unwrap();
    }

    #[tokio::test]
    async fn test_store_is_file_backed_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let mut page = config(None);
        page.store_path = Some(dir.path().join("page.json"));

        let (connector, _peers) = MockConnector::new(vec![]);
        let session = PageSession::bootstrap_with(page, connector).await.unwrap();
        session.store().set_theme(crate::storage::Theme::Dark).unwrap();
        session.teardown().await.unwrap();

        let reopened = ExpiringStore::open(dir.path().join("page.json")).unwrap();
        assert_eq!(reopened.theme(), crate::storage::Theme::Dark);
    }
}
