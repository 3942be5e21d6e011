use thiserror::Error;

/// Failures of the DevTools connection itself, below the engine's
/// element-level errors.
#[derive(Debug, Error)]
pub enum CdpError {
    #[error("Cannot connect to browser: {0}")]
    ConnectionFailed(String),

    /// Nothing answered `/json/version` at the endpoint.
    #[error("No DevTools endpoint at {0}")]
    BrowserNotAvailable(String),

    #[error("DevTools socket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The browser rejected a command.
    #[error("{message} (CDP code {code})")]
    Protocol { code: i64, message: String },

    #[error("Malformed DevTools message: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("DevTools endpoint discovery failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    /// An exception thrown by page script.
    #[error("{0}")]
    JavaScript(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    /// The socket is gone; pending and later commands fail with this.
    #[error("DevTools session closed")]
    SessionClosed,

    #[error("Unexpected DevTools reply: {0}")]
    InvalidResponse(String),
}

impl From<url::ParseError> for CdpError {
    fn from(e: url::ParseError) -> Self {
        CdpError::ConnectionFailed(format!("invalid endpoint URL: {}", e))
    }
}
