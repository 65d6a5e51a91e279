// Response Iterator - batched consumption of a response queue

use crate::application::response_queue::{Poll, ResponseQueue};
use crate::domain::StreamEnd;
use crate::error::Result;
use serde_json::Value;
use tracing::{debug, warn};

/// Iterator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IteratorState {
    Active,
    /// Terminal
    Done,
}

/// Batch configuration for `Client::iterate`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    pub batch_size: usize,
}

impl BatchOptions {
    pub fn new(batch_size: usize) -> Self {
        Self { batch_size }
    }
}

/// Stateful cursor over a response queue
///
/// Obtained from `Client::iterate`. Batches are pulled on demand with
/// `get_more` (bounded) or `all` (unbounded). The queue is not released
/// until `finished` is called.
///
/// # Example
/// ```text
/// let mut results = client.iterate("search", &request, &options, None)?;
/// while !results.is_done() {
///     for row in results.get_more()? {
///         handle(row);
///     }
/// }
/// results.finished();
/// ```
pub struct ResponseIterator {
    queue: ResponseQueue,
    batch_size: usize,
    state: IteratorState,
    end: Option<StreamEnd>,
    /// Messages received but not yet handed out
    pending: Vec<Value>,
    released: bool,
}

impl ResponseIterator {
    pub(crate) fn new(queue: ResponseQueue, batch_size: usize) -> Self {
        Self {
            queue,
            batch_size,
            state: IteratorState::Active,
            end: None,
            pending: Vec::new(),
            released: false,
        }
    }

    /// Fetch up to `batch_size` messages
    ///
    /// Stops early on the EOF sentinel or an empty `get`, both of which
    /// mark the iterator done. Once done, returns an empty batch without
    /// touching the transport.
    ///
    /// On error the messages received so far stay buffered and are
    /// returned by the next call.
    pub fn get_more(&mut self) -> Result<Vec<Value>> {
        while self.state == IteratorState::Active && self.pending.len() < self.batch_size {
            self.pull()?;
        }

        let take = self.pending.len().min(self.batch_size);
        let batch: Vec<Value> = self.pending.drain(..take).collect();
        debug!(
            queue = %self.queue.name(),
            count = batch.len(),
            done = self.is_done(),
            "Batch fetched"
        );
        Ok(batch)
    }

    /// Drain every remaining message, ignoring the batch size
    pub fn all(&mut self) -> Result<Vec<Value>> {
        while self.state == IteratorState::Active {
            self.pull()?;
        }
        Ok(std::mem::take(&mut self.pending))
    }

    /// Release the response queue
    ///
    /// Consumes the iterator so the queue is deleted at most once.
    /// Returns whether the transport confirmed the delete.
    pub fn finished(mut self) -> bool {
        self.released = true;
        self.queue.release()
    }

    pub fn is_done(&self) -> bool {
        self.state == IteratorState::Done
    }

    pub fn state(&self) -> IteratorState {
        self.state
    }

    /// Why the stream ended, once it has
    pub fn end_reason(&self) -> Option<StreamEnd> {
        self.end
    }

    pub fn response_queue(&self) -> &str {
        self.queue.name()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn pull(&mut self) -> Result<()> {
        match self.queue.poll()? {
            Poll::Message(value) => self.pending.push(value),
            Poll::End(reason) => self.mark_done(reason),
        }
        Ok(())
    }

    fn mark_done(&mut self, reason: StreamEnd) {
        if reason == StreamEnd::TimedOut {
            warn!(
                queue = %self.queue.name(),
                "Response queue timed out, treating stream as complete"
            );
        }
        self.state = IteratorState::Done;
        self.end = Some(reason);
    }
}

impl Iterator for ResponseIterator {
    type Item = Result<Vec<Value>>;

    /// Yields non-empty batches until the stream is done
    fn next(&mut self) -> Option<Self::Item> {
        if self.is_done() && self.pending.is_empty() {
            return None;
        }
        match self.get_more() {
            Ok(batch) if batch.is_empty() && self.is_done() => None,
            other => Some(other),
        }
    }
}

impl Drop for ResponseIterator {
    fn drop(&mut self) {
        if !self.released {
            warn!(
                queue = %self.queue.name(),
                "Response iterator dropped without finished(), queue left on transport"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Acknowledgement;
    use crate::port::queue_transport::mocks::ScriptedTransport;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn iterator(transport: &Arc<ScriptedTransport>, batch_size: usize) -> ResponseIterator {
        let queue = ResponseQueue::new(
            transport.clone(),
            "response-it",
            Duration::from_millis(10),
            Acknowledgement::Never,
        );
        ResponseIterator::new(queue, batch_size)
    }

    fn rows(n: usize) -> Vec<serde_json::Value> {
        (1..=n).map(|i| json!({"row": i})).collect()
    }

    #[test]
    fn test_get_more_returns_full_batch_and_stays_active() {
        let transport = Arc::new(ScriptedTransport::with_json(rows(5)));
        let mut results = iterator(&transport, 3);

        let batch = results.get_more().unwrap();
        assert_eq!(batch, rows(3));
        assert!(!results.is_done());
        assert_eq!(transport.get_count(), 3);
        results.finished();
    }

    #[test]
    fn test_eof_mid_batch_marks_done() {
        let mut script = rows(2);
        script.push(json!({"EOF": true}));
        let transport = Arc::new(ScriptedTransport::with_json(script));
        let mut results = iterator(&transport, 10);

        assert_eq!(results.get_more().unwrap(), rows(2));
        assert!(results.is_done());
        assert_eq!(results.end_reason(), Some(StreamEnd::Eof));

        let gets = transport.get_count();
        assert!(results.get_more().unwrap().is_empty());
        assert_eq!(transport.get_count(), gets, "done iterator must not poll");
        results.finished();
    }

    #[test]
    fn test_empty_get_marks_done_as_timeout() {
        let transport = Arc::new(ScriptedTransport::with_json(rows(1)));
        let mut results = iterator(&transport, 10);

        assert_eq!(results.get_more().unwrap(), rows(1));
        assert!(results.is_done());
        assert_eq!(results.end_reason(), Some(StreamEnd::TimedOut));
        results.finished();
    }

    #[test]
    fn test_all_ignores_batch_size_and_does_not_delete() {
        let mut script = rows(7);
        script.push(json!({"EOF": 1}));
        let transport = Arc::new(ScriptedTransport::with_json(script));
        let mut results = iterator(&transport, 2);

        assert_eq!(results.all().unwrap(), rows(7));
        assert!(results.is_done());
        assert!(transport.deleted_queues().is_empty());

        assert!(results.finished());
        assert_eq!(transport.deleted_queues(), vec!["response-it".to_string()]);
    }

    #[test]
    fn test_buffered_messages_survive_transport_error() {
        let transport = Arc::new(ScriptedTransport::with_json(rows(2)));
        transport.push_failure("connection reset");
        transport.push_json(&json!({"row": 3}));
        transport.push_json(&json!({"EOF": true}));
        let mut results = iterator(&transport, 5);

        assert!(results.get_more().is_err());
        assert!(!results.is_done());

        assert_eq!(results.get_more().unwrap(), rows(3));
        assert!(results.is_done());
        results.finished();
    }

    #[test]
    fn test_std_iterator_yields_batches_until_done() {
        let mut script = rows(5);
        script.push(json!({"EOF": true}));
        let transport = Arc::new(ScriptedTransport::with_json(script));
        let mut results = iterator(&transport, 2);

        let batches: Vec<Vec<serde_json::Value>> =
            results.by_ref().collect::<Result<_>>().unwrap();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches.concat(), rows(5));
        assert!(results.is_done());
        results.finished();
    }

    #[test]
    fn test_done_flag_is_monotonic() {
        let transport = Arc::new(ScriptedTransport::with_json(vec![json!({"EOF": true})]));
        transport.push_json(&json!({"row": "late"}));
        let mut results = iterator(&transport, 4);

        assert!(results.get_more().unwrap().is_empty());
        assert!(results.is_done());
        assert!(results.all().unwrap().is_empty());
        assert!(results.is_done());
        assert_eq!(results.state(), IteratorState::Done);
        results.finished();
    }
}
