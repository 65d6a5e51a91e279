// Domain Layer - Wire-level protocol values

pub mod envelope;
pub mod error;
pub mod message;

// Re-exports
pub use envelope::{Envelope, DEADLINE_FIELD, RESPONSE_QUEUE_FIELD, TRACE_ID_FIELD};
pub use error::DecodeError;
pub use message::{is_eof_sentinel, ResponseMessage, StreamEnd, EOF_KEY};

/// Queue identifier
pub type QueueName = String;
