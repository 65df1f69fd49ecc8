use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors from discovery and delivery.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("agent already registered: {0}")]
    DuplicateAgent(String),

    #[error("agent not registered: {0}")]
    UnknownAgent(String),

    #[error("inbox full for agent {0}")]
    InboxFull(String),

    #[error("agent {0} disconnected")]
    Disconnected(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for TransportError {
    fn from(e: serde_json::Error) -> Self {
        TransportError::Serialization(e.to_string())
    }
}
