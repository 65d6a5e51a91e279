// Queue Transport Port
// Abstraction over the shared queue service (Kestrel, in-memory, ...)

use std::time::Duration;
use thiserror::Error;

/// Transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol violation: {0}")]
    Protocol(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Transport unavailable: {0}")]
    Unavailable(String),
}

/// Queue Transport trait
///
/// Implementations:
/// - KestrelTransport: memcache text protocol over TCP
/// - MemoryTransport: in-process queues for tests and embedded workers
///
/// Every call is blocking. `get` is the only call expected to wait.
#[cfg_attr(test, mockall::automock)]
pub trait QueueTransport: Send + Sync {
    /// Append `payload` to `queue`
    ///
    /// # Arguments
    /// * `expiration` - Optional lifetime of the item on the server
    ///
    /// Returns false when the server refused to store the item.
    fn put(
        &self,
        queue: &str,
        payload: &[u8],
        expiration: Option<Duration>,
    ) -> Result<bool, TransportError>;

    /// Take the next item from `queue`, waiting up to `timeout`
    ///
    /// Returns `Ok(None)` when nothing arrived in time.
    fn get(&self, queue: &str, timeout: Duration) -> Result<Option<Vec<u8>>, TransportError>;

    /// Acknowledge the last item read from `queue`
    ///
    /// Transports without reliable reads treat this as a no-op.
    fn confirm(&self, queue: &str) -> Result<bool, TransportError>;

    /// Remove `queue` from the server
    fn delete(&self, queue: &str) -> Result<bool, TransportError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Recorded transport invocation
    #[derive(Debug, Clone, PartialEq)]
    pub enum TransportCall {
        Put {
            queue: String,
            payload: Vec<u8>,
            expiration: Option<Duration>,
        },
        Get {
            queue: String,
            timeout: Duration,
        },
        Confirm {
            queue: String,
        },
        Delete {
            queue: String,
        },
    }

    /// Scripted reply for one `get`
    #[derive(Debug, Clone)]
    pub enum ScriptedReply {
        Message(Vec<u8>),
        Empty,
        Fail(String),
    }

    /// Outcome of `put`/`delete`
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        Accept,
        Reject,
        Fail(String),
    }

    impl MockBehavior {
        fn apply(&self) -> Result<bool, TransportError> {
            match self {
                MockBehavior::Accept => Ok(true),
                MockBehavior::Reject => Ok(false),
                MockBehavior::Fail(msg) => Err(TransportError::Unavailable(msg.clone())),
            }
        }
    }

    struct ScriptState {
        replies: VecDeque<ScriptedReply>,
        calls: Vec<TransportCall>,
        put_behavior: MockBehavior,
        delete_behavior: MockBehavior,
    }

    /// Transport that replays a fixed script of `get` replies
    ///
    /// Once the script is exhausted every `get` returns `Ok(None)`.
    pub struct ScriptedTransport {
        state: Mutex<ScriptState>,
    }

    impl Default for ScriptedTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self {
                state: Mutex::new(ScriptState {
                    replies: VecDeque::new(),
                    calls: Vec::new(),
                    put_behavior: MockBehavior::Accept,
                    delete_behavior: MockBehavior::Accept,
                }),
            }
        }

        /// Script a series of JSON replies
        pub fn with_json<I>(values: I) -> Self
        where
            I: IntoIterator<Item = serde_json::Value>,
        {
            let transport = Self::new();
            for value in values {
                transport.push_json(&value);
            }
            transport
        }

        pub fn push_json(&self, value: &serde_json::Value) {
            self.push_raw(value.to_string().into_bytes());
        }

        pub fn push_raw(&self, bytes: Vec<u8>) {
            self.push(ScriptedReply::Message(bytes));
        }

        pub fn push_empty(&self) {
            self.push(ScriptedReply::Empty);
        }

        pub fn push_failure(&self, message: impl Into<String>) {
            self.push(ScriptedReply::Fail(message.into()));
        }

        pub fn set_put_behavior(&self, behavior: MockBehavior) {
            self.state.lock().unwrap().put_behavior = behavior;
        }

        pub fn set_delete_behavior(&self, behavior: MockBehavior) {
            self.state.lock().unwrap().delete_behavior = behavior;
        }

        pub fn calls(&self) -> Vec<TransportCall> {
            self.state.lock().unwrap().calls.clone()
        }

        /// Queue names passed to `delete`, in call order
        pub fn deleted_queues(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    TransportCall::Delete { queue } => Some(queue),
                    _ => None,
                })
                .collect()
        }

        pub fn get_count(&self) -> usize {
            self.count(|call| matches!(call, TransportCall::Get { .. }))
        }

        pub fn confirm_count(&self) -> usize {
            self.count(|call| matches!(call, TransportCall::Confirm { .. }))
        }

        /// Last payload passed to `put`, parsed as JSON
        pub fn last_put_json(&self) -> Option<serde_json::Value> {
            self.calls().into_iter().rev().find_map(|call| match call {
                TransportCall::Put { payload, .. } => serde_json::from_slice(&payload).ok(),
                _ => None,
            })
        }

        fn count(&self, predicate: impl Fn(&TransportCall) -> bool) -> usize {
            self.state
                .lock()
                .unwrap()
                .calls
                .iter()
                .filter(|call| predicate(call))
                .count()
        }

        fn push(&self, reply: ScriptedReply) {
            self.state.lock().unwrap().replies.push_back(reply);
        }

        fn record(&self, call: TransportCall) {
            self.state.lock().unwrap().calls.push(call);
        }
    }

    impl QueueTransport for ScriptedTransport {
        fn put(
            &self,
            queue: &str,
            payload: &[u8],
            expiration: Option<Duration>,
        ) -> Result<bool, TransportError> {
            self.record(TransportCall::Put {
                queue: queue.to_string(),
                payload: payload.to_vec(),
                expiration,
            });
            let behavior = self.state.lock().unwrap().put_behavior.clone();
            behavior.apply()
        }

        fn get(&self, queue: &str, timeout: Duration) -> Result<Option<Vec<u8>>, TransportError> {
            self.record(TransportCall::Get {
                queue: queue.to_string(),
                timeout,
            });
            let reply = self.state.lock().unwrap().replies.pop_front();
            match reply {
                Some(ScriptedReply::Message(bytes)) => Ok(Some(bytes)),
                Some(ScriptedReply::Empty) | None => Ok(None),
                Some(ScriptedReply::Fail(msg)) => Err(TransportError::Unavailable(msg)),
            }
        }

        fn confirm(&self, queue: &str) -> Result<bool, TransportError> {
            self.record(TransportCall::Confirm {
                queue: queue.to_string(),
            });
            Ok(true)
        }

        fn delete(&self, queue: &str) -> Result<bool, TransportError> {
            self.record(TransportCall::Delete {
                queue: queue.to_string(),
            });
            let behavior = self.state.lock().unwrap().delete_behavior.clone();
            behavior.apply()
        }
    }
}
