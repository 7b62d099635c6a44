use thiserror::Error;

/// Errors that can occur in the real-time channel layer.
#[derive(Error, Debug)]
pub enum RealtimeError {
    /// WebSocket protocol error (connection failed, invalid frame, etc.)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// General connection error with descriptive message
    #[error("Connection error: {0}")]
    Connection(String),

    /// Endpoint could not be derived from the page context
    #[error("Endpoint error: {0}")]
    Endpoint(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A frame was valid JSON but not a valid message
    #[error("Decode error: {0}")]
    Decode(String),

    /// HTTP transport error talking to a collaborator endpoint
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Collaborator endpoint answered with a non-success status
    #[error("Request failed with status {status}: {message}")]
    Collaborator { status: u16, message: String },

    /// URL parsing error (malformed endpoint URL)
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Persisted state could not be read or written
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Attempted operation while not connected to the server
    #[error("Not connected")]
    NotConnected,
}

/// Convenience type alias for `Result<T, RealtimeError>`.
pub type Result<T> = std::result::Result<T, RealtimeError>;
