// Central Error Type for the Client

use thiserror::Error;

/// Client-level error type
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Send aborted on queue '{queue}': {reason}")]
    SendAborted { queue: String, reason: String },

    #[error("Transport error: {0}")]
    Transport(#[from] crate::port::TransportError),

    #[error("Decode error: {0}")]
    Decode(#[from] crate::domain::DecodeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using ClientError
pub type Result<T> = std::result::Result<T, ClientError>;
