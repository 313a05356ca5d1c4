//! Error types for the TableMirror SDK.

use thiserror::Error;

/// Connection-level faults. These never escape the reconnect loop; they are
/// logged and surface only as close events.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        TransportError::Protocol(err.to_string())
    }
}

/// Error type for SDK operations.
#[derive(Error, Debug)]
pub enum SdkError {
    #[error("WS URL not configured")]
    MissingUrl,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type for SDK operations.
pub type Result<T> = std::result::Result<T, SdkError>;
