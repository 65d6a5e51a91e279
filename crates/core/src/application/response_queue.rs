// Response Queue - one owned reply channel on the transport

use crate::application::decoder;
use crate::config::Acknowledgement;
use crate::domain::{QueueName, ResponseMessage, StreamEnd};
use crate::error::Result;
use crate::port::QueueTransport;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of a single poll step
#[derive(Debug, Clone, PartialEq)]
pub enum Poll {
    Message(Value),
    End(StreamEnd),
}

/// Handle over a response queue owned by a single request
pub struct ResponseQueue {
    transport: Arc<dyn QueueTransport>,
    name: QueueName,
    timeout: Duration,
    acknowledgement: Acknowledgement,
}

impl ResponseQueue {
    pub fn new(
        transport: Arc<dyn QueueTransport>,
        name: impl Into<String>,
        timeout: Duration,
        acknowledgement: Acknowledgement,
    ) -> Self {
        Self {
            transport,
            name: name.into(),
            timeout,
            acknowledgement,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the next message
    ///
    /// An empty `get` ends the stream exactly like the EOF sentinel does;
    /// the two are only told apart by the returned `StreamEnd`.
    pub fn poll(&self) -> Result<Poll> {
        let bytes = match self.transport.get(&self.name, self.timeout)? {
            Some(bytes) => bytes,
            None => {
                debug!(
                    queue = %self.name,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "No message before timeout"
                );
                return Ok(Poll::End(StreamEnd::TimedOut));
            }
        };

        if self.acknowledgement == Acknowledgement::PerMessage {
            self.confirm();
        }

        match decoder::decode_message(&bytes)? {
            ResponseMessage::Eof => {
                debug!(queue = %self.name, "EOF sentinel received");
                Ok(Poll::End(StreamEnd::Eof))
            }
            ResponseMessage::Data(value) => Ok(Poll::Message(value)),
        }
    }

    /// Delete the queue from the transport
    ///
    /// Failures are logged, never raised. Returns true only when the
    /// transport confirmed the delete.
    pub fn release(&self) -> bool {
        match self.transport.delete(&self.name) {
            Ok(true) => {
                debug!(queue = %self.name, "Response queue released");
                true
            }
            Ok(false) => {
                warn!(queue = %self.name, "Transport did not delete response queue");
                false
            }
            Err(e) => {
                warn!(queue = %self.name, error = %e, "Failed to delete response queue");
                false
            }
        }
    }

    fn confirm(&self) {
        match self.transport.confirm(&self.name) {
            Ok(true) => {}
            Ok(false) => warn!(queue = %self.name, "Transport rejected confirm"),
            Err(e) => warn!(queue = %self.name, error = %e, "Confirm failed"),
        }
    }
}
