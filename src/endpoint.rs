use crate::infrastructure::ReconnectPolicy;
use crate::types::constants::paths;
use crate::types::{RealtimeError, Result};
use url::Url;

/// Identity a channel is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelScope {
    User(String),
    Room(String),
}

impl ChannelScope {
    pub fn id(&self) -> &str {
        match self {
            Self::User(id) | Self::Room(id) => id,
        }
    }

    fn trimmed(self) -> Self {
        match self {
            Self::User(id) => Self::User(id.trim().to_string()),
            Self::Room(id) => Self::Room(id.trim().to_string()),
        }
    }

    fn path_prefix(&self) -> &'static str {
        match self {
            Self::User(_) => paths::USER_CHANNEL,
            Self::Room(_) => paths::ROOM_CHANNEL,
        }
    }

    /// Reconnection preset matching the scope.
    pub fn default_policy(&self) -> ReconnectPolicy {
        match self {
            Self::User(_) => ReconnectPolicy::user_channel(),
            Self::Room(_) => ReconnectPolicy::room_channel(),
        }
    }
}

/// Where a channel connects. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEndpoint {
    url: Url,
    scope: ChannelScope,
}

impl ChannelEndpoint {
    /// Builds the endpoint from page transport security and host (`host` may carry a port).
    /// The scope id is trimmed and travels as a single escaped path segment.
    pub fn new(secure: bool, host: &str, scope: ChannelScope) -> Result<Self> {
        let scope = scope.trimmed();
        if scope.id().is_empty() {
            return Err(RealtimeError::Endpoint(
                "channel scope id must not be empty".to_string(),
            ));
        }
        if host.is_empty() {
            return Err(RealtimeError::Endpoint("host must not be empty".to_string()));
        }

        let scheme = if secure { "wss" } else { "ws" };
        let mut url = Url::parse(&format!("{}://{}/", scheme, host))?;
        url.path_segments_mut()
            .map_err(|_| RealtimeError::Endpoint(format!("'{}' cannot carry a path", host)))?
            .pop_if_empty()
            .extend(scope.path_prefix().split('/'))
            .push(scope.id())
            .push("");

        Ok(Self { url, scope })
    }

    /// Derives the endpoint from the URL the page was served from.
    pub fn from_page_url(page_url: &str, scope: ChannelScope) -> Result<Self> {
        let page = Url::parse(page_url)?;
        let secure = match page.scheme() {
            "https" => true,
            "http" => false,
            other => {
                return Err(RealtimeError::Endpoint(format!(
                    "unsupported page scheme '{}'",
                    other
                )));
            }
        };
        let host = page
            .host_str()
            .ok_or_else(|| RealtimeError::Endpoint("page URL has no host".to_string()))?;
        let host = match page.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Self::new(secure, &host, scope)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn scope(&self) -> &ChannelScope {
        &self.scope
    }

    /// Room id for room-scoped endpoints.
    pub fn room_id(&self) -> Option<&str> {
        match &self.scope {
            ChannelScope::Room(id) => Some(id),
            ChannelScope::User(_) => None,
        }
    }
}

impl std::fmt::Display for ChannelEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.url.as_str())
    }
}
