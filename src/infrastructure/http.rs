use crate::types::constants::CSRF_HEADER;
use crate::types::{EntityId, RealtimeError, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// A file attached to a chat message.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Fields for `POST /chat/{room}/send/`.
#[derive(Debug, Clone, Default)]
pub struct FileMessage {
    pub content: String,
    /// `text`, `image` or `file`; the server defaults to `text`
    pub message_type: Option<String>,
    pub parent_message: Option<String>,
    pub file: Option<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RoomCreated {
    pub room_id: EntityId,
    #[serde(default)]
    pub redirect_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageSent {
    pub message_id: EntityId,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Preferences posted to the account settings endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_notifications: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_notifications: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_online_status: Option<bool>,
}

/// Request/response calls to the site's HTTP API.
///
/// Every request carries the page's CSRF token and is marked as an XHR. A non-2xx
/// response becomes [`RealtimeError::Collaborator`]; nothing is retried.
#[derive(Debug, Clone)]
pub struct CollaboratorClient {
    base: Url,
    csrf_token: String,
    http: reqwest::Client,
}

impl CollaboratorClient {
    pub fn new(base: Url, csrf_token: impl Into<String>) -> Self {
        Self {
            base,
            csrf_token: csrf_token.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Uses the scheme and authority of `page_url` as the API base.
    pub fn for_page(page_url: &str, csrf_token: impl Into<String>) -> Result<Self> {
        let mut base = Url::parse(page_url)?;
        base.set_path("/");
        base.set_query(None);
        base.set_fragment(None);
        Ok(Self::new(base, csrf_token))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(CSRF_HEADER, &self.csrf_token)
            .header("X-Requested-With", "XMLHttpRequest")
    }

    fn get(&self, path: &str) -> Result<RequestBuilder> {
        Ok(self.authorized(self.http.get(self.url(path)?)))
    }

    fn post(&self, path: &str) -> Result<RequestBuilder> {
        Ok(self.authorized(self.http.post(self.url(path)?)))
    }

    fn search_users_request(&self, query: &str) -> Result<RequestBuilder> {
        Ok(self.get("chat/user-search/")?.query(&[("q", query)]))
    }

    fn create_room_request(
        &self,
        name: &str,
        room_type: &str,
        description: &str,
    ) -> Result<RequestBuilder> {
        Ok(self.post("chat/create/")?.form(&[
            ("name", name),
            ("room_type", room_type),
            ("description", description),
        ]))
    }

    fn send_file_message_request(
        &self,
        room_id: &str,
        message: FileMessage,
    ) -> Result<RequestBuilder> {
        let mut form = Form::new().text("content", message.content).text(
            "message_type",
            message.message_type.unwrap_or_else(|| "text".to_string()),
        );
        if let Some(parent) = message.parent_message {
            form = form.text("parent_message", parent);
        }
        if let Some(file) = message.file {
            form = form.part("file", Part::bytes(file.bytes).file_name(file.file_name));
        }
        Ok(self
            .post(&format!("chat/{}/send/", room_id))?
            .multipart(form))
    }

    fn toggle_follow_request(&self, user_id: &str) -> Result<RequestBuilder> {
        self.post(&format!("accounts/api/follow/{}/", user_id))
    }

    fn settings_request(&self, settings: &NotificationSettings) -> Result<RequestBuilder> {
        Ok(self.post("accounts/settings/")?.json(settings))
    }

    fn online_status_request(&self, is_online: bool) -> Result<RequestBuilder> {
        Ok(self
            .post("accounts/api/online-status/")?
            .json(&serde_json::json!({ "is_online": is_online })))
    }

    fn session_heartbeat_request(&self) -> Result<RequestBuilder> {
        self.post("accounts/api/heartbeat/")
    }

    fn mark_room_read_request(&self, room_id: &str) -> Result<RequestBuilder> {
        self.post(&format!("chat/{}/mark-read/", room_id))
    }

    fn react_request(&self, message_id: &str, emoji: &str) -> Result<RequestBuilder> {
        Ok(self
            .post(&format!("chat/message/{}/react/", message_id))?
            .form(&[("emoji", emoji)]))
    }

    pub async fn search_users(&self, query: &str) -> Result<Value> {
        execute(self.search_users_request(query)?).await
    }

    pub async fn create_room(
        &self,
        name: &str,
        room_type: &str,
        description: &str,
    ) -> Result<RoomCreated> {
        let body = execute(self.create_room_request(name, room_type, description)?).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Sends a message through HTTP, used when it carries a file.
    pub async fn send_file_message(&self, room_id: &str, message: FileMessage) -> Result<MessageSent> {
        let body = execute(self.send_file_message_request(room_id, message)?).await?;
        Ok(serde_json::from_value(body)?)
    }

    pub async fn toggle_follow(&self, user_id: &str) -> Result<Value> {
        execute(self.toggle_follow_request(user_id)?).await
    }

    pub async fn update_notification_settings(
        &self,
        settings: &NotificationSettings,
    ) -> Result<Value> {
        execute(self.settings_request(settings)?).await
    }

    pub async fn ping_online_status(&self, is_online: bool) -> Result<Value> {
        execute(self.online_status_request(is_online)?).await
    }

    pub async fn session_heartbeat(&self) -> Result<Value> {
        execute(self.session_heartbeat_request()?).await
    }

    pub async fn mark_room_read(&self, room_id: &str) -> Result<Value> {
        execute(self.mark_room_read_request(room_id)?).await
    }

    pub async fn react_to_message(&self, message_id: &str, emoji: &str) -> Result<Value> {
        execute(self.react_request(message_id, emoji)?).await
    }
}

async fn execute(request: RequestBuilder) -> Result<Value> {
    let response = request.send().await?;
    let url = response.url().clone();
    let body = read_response(response).await?;
    tracing::debug!("Collaborator call to {} succeeded", url.path());
    Ok(body)
}

/// Empty bodies read as `null`.
async fn read_response(response: Response) -> Result<Value> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let message = error_message(&text).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
        tracing::warn!("Collaborator call failed with {}: {}", status, message);
        return Err(RealtimeError::Collaborator {
            status: status.as_u16(),
            message,
        });
    }

    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text)?)
}

/// The server reports failures as `{"error": "..."}`.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value.get("error")?.as_str().map(str::to_string)
}
