use thiserror::Error;

/// Errors talking to the log backend
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid backend URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("cannot derive a push URL from scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("push channel error: {0}")]
    WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The backend answered but reported `success: false`
    #[error("{0}")]
    Backend(String),
}

impl ClientError {
    /// Whether the backend itself rejected the request (as opposed to the
    /// request never getting a usable answer)
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend(_))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(error))
    }
}
