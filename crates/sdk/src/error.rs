//! SDK Error Types

use kestrel_net_core::port::TransportError;
use kestrel_net_core::ClientError;
use thiserror::Error;

/// SDK Result type
pub type Result<T> = std::result::Result<T, SdkError>;

/// SDK Error
#[derive(Debug, Error)]
pub enum SdkError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Response did not match the expected type: {0}")]
    UnexpectedResponse(#[from] serde_json::Error),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl From<TransportError> for SdkError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Connection(msg) => SdkError::Connection(msg),
            other => SdkError::Connection(other.to_string()),
        }
    }
}
