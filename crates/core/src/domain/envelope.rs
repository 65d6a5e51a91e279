// Envelope Domain Model

use super::QueueName;

/// Field carrying the response queue name a worker must reply on
pub const RESPONSE_QUEUE_FIELD: &str = "response_queue";

/// Field carrying the optional trace identifier
pub const TRACE_ID_FIELD: &str = "trace_id";

/// Field carrying the optional ISO-8601 deadline
pub const DEADLINE_FIELD: &str = "deadline";

/// Serialized outgoing request
///
/// Built by `RequestBuilder`; the bytes are frozen once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    response_queue: QueueName,
    trace_id: Option<String>,
    body: Vec<u8>,
}

impl Envelope {
    pub fn new(response_queue: impl Into<String>, trace_id: Option<String>, body: Vec<u8>) -> Self {
        Self {
            response_queue: response_queue.into(),
            trace_id,
            body,
        }
    }

    pub fn response_queue(&self) -> &str {
        &self.response_queue
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.body
    }

    /// Split into queue name and serialized body
    pub fn into_parts(self) -> (QueueName, Vec<u8>) {
        (self.response_queue, self.body)
    }
}
