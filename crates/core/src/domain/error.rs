// Domain Error Types

use thiserror::Error;

/// Failure to interpret a response payload.
///
/// Both variants come from the compressed fallback path: the plain JSON
/// parse error is discarded once decompression is attempted.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Payload is neither JSON nor gzip: {0}")]
    Decompress(#[from] std::io::Error),

    #[error("Decompressed payload is not valid JSON: {0}")]
    CompressedJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DecodeError>;
