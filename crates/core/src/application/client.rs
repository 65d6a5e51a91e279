// Client - synchronous request/response exchange over a queue transport

use crate::application::iterator::{BatchOptions, ResponseIterator};
use crate::application::request_builder::{RequestBuilder, RequestOptions};
use crate::application::response_queue::{Poll, ResponseQueue};
use crate::config::{Acknowledgement, ClientConfig};
use crate::domain::{Envelope, QueueName, StreamEnd};
use crate::error::{ClientError, Result};
use crate::port::{IdProvider, QueueTransport, UuidProvider};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of `Client::send_detailed`
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub messages: Vec<Value>,
    pub end: StreamEnd,
    pub response_queue: QueueName,
    /// Whether the transport confirmed deletion of the response queue
    pub released: bool,
}

impl Response {
    /// True when the stream ended on a timeout rather than the EOF sentinel
    pub fn may_be_incomplete(&self) -> bool {
        self.end == StreamEnd::TimedOut
    }
}

/// Request/response client
///
/// The transport is shared, never owned: many clients may use the same
/// connection as long as concurrent requests use distinct suffixes.
pub struct Client {
    transport: Arc<dyn QueueTransport>,
    builder: RequestBuilder,
    timeout: Duration,
    batch_size: usize,
    acknowledgement: Acknowledgement,
}

impl Client {
    /// Create a client generating UUID v4 trace ids
    pub fn new(transport: Arc<dyn QueueTransport>, config: &ClientConfig) -> Self {
        Self::with_id_provider(transport, config, Arc::new(UuidProvider))
    }

    pub fn with_id_provider(
        transport: Arc<dyn QueueTransport>,
        config: &ClientConfig,
        id_provider: Arc<dyn IdProvider>,
    ) -> Self {
        Self {
            transport,
            builder: RequestBuilder::new(config.response_queue_prefix.clone(), id_provider),
            timeout: config.timeout,
            batch_size: config.batch_size,
            acknowledgement: config.acknowledgement,
        }
    }

    pub fn request_builder(&self) -> &RequestBuilder {
        &self.builder
    }

    /// Send a request and collect every response until EOF or timeout
    ///
    /// The response queue is deleted afterwards; a failed delete is only
    /// logged.
    ///
    /// # Errors
    /// - ClientError::SendAborted if the request could not be pushed
    /// - ClientError::Decode if a response is neither JSON nor gzipped JSON
    /// - ClientError::Transport if polling the response queue fails
    pub fn send<T>(&self, queue: &str, request: &T, options: &RequestOptions) -> Result<Vec<Value>>
    where
        T: Serialize + ?Sized,
    {
        self.send_detailed(queue, request, options)
            .map(|response| response.messages)
    }

    /// Like `send`, also reporting how the stream ended
    pub fn send_detailed<T>(
        &self,
        queue: &str,
        request: &T,
        options: &RequestOptions,
    ) -> Result<Response>
    where
        T: Serialize + ?Sized,
    {
        let response_queue = self.submit(queue, request, options)?;

        let mut messages = Vec::new();
        let collected = loop {
            match response_queue.poll() {
                Ok(Poll::Message(value)) => messages.push(value),
                Ok(Poll::End(end)) => break Ok(end),
                Err(e) => break Err(e),
            }
        };

        let released = response_queue.release();

        let end = collected?;
        if end == StreamEnd::TimedOut {
            warn!(
                queue = %response_queue.name(),
                received = messages.len(),
                "Response queue timed out before EOF, results may be incomplete"
            );
        }
        info!(
            queue = %queue,
            response_queue = %response_queue.name(),
            received = messages.len(),
            end = %end,
            "Request completed"
        );

        Ok(Response {
            messages,
            end,
            response_queue: response_queue.name().to_string(),
            released,
        })
    }

    /// Send a request and return an iterator over its response queue
    ///
    /// Does not poll. Batch size defaults to the configured one.
    pub fn iterate<T>(
        &self,
        queue: &str,
        request: &T,
        options: &RequestOptions,
        batch: Option<BatchOptions>,
    ) -> Result<ResponseIterator>
    where
        T: Serialize + ?Sized,
    {
        let batch_size = batch.map_or(self.batch_size, |b| b.batch_size);
        if batch_size == 0 {
            return Err(ClientError::InvalidRequest(
                "batch size must be at least 1".to_string(),
            ));
        }

        let response_queue = self.submit(queue, request, options)?;
        Ok(ResponseIterator::new(response_queue, batch_size))
    }

    /// Build the envelope and push it to `queue`
    fn submit<T>(&self, queue: &str, request: &T, options: &RequestOptions) -> Result<ResponseQueue>
    where
        T: Serialize + ?Sized,
    {
        let envelope = self.builder.prepare(request, options)?;
        self.push(queue, &envelope, options.expiration)?;

        Ok(ResponseQueue::new(
            Arc::clone(&self.transport),
            envelope.response_queue(),
            self.timeout,
            self.acknowledgement,
        ))
    }

    fn push(&self, queue: &str, envelope: &Envelope, expiration: Option<Duration>) -> Result<()> {
        let aborted = |reason: String| ClientError::SendAborted {
            queue: queue.to_string(),
            reason,
        };

        match self.transport.put(queue, envelope.as_bytes(), expiration) {
            Ok(true) => {
                debug!(
                    queue = %queue,
                    response_queue = %envelope.response_queue(),
                    trace_id = envelope.trace_id().unwrap_or("-"),
                    bytes = envelope.as_bytes().len(),
                    "Request pushed"
                );
                Ok(())
            }
            Ok(false) => Err(aborted("transport refused the request".to_string())),
            Err(e) => Err(aborted(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::queue_transport::mocks::{MockBehavior, ScriptedTransport, TransportCall};
    use crate::port::queue_transport::MockQueueTransport;
    use crate::port::TransportError;
    use serde_json::json;

    fn config() -> ClientConfig {
        ClientConfig {
            response_queue_prefix: "resp-".to_string(),
            timeout: Duration::from_millis(50),
            ..Default::default()
        }
    }

    #[test]
    fn test_send_collects_until_eof_and_deletes_once() {
        let transport = Arc::new(ScriptedTransport::with_json(vec![
            json!({"row": 1}),
            json!({"row": 2}),
            json!({"EOF": true}),
        ]));
        let client = Client::new(transport.clone(), &config());

        let rows = client
            .send("q", &json!({"statement": "x"}), &RequestOptions::new())
            .unwrap();

        assert_eq!(rows, vec![json!({"row": 1}), json!({"row": 2})]);
        assert_eq!(transport.deleted_queues(), vec!["resp-".to_string()]);
        assert_eq!(
            transport.last_put_json().unwrap(),
            json!({"statement": "x", "response_queue": "resp-"})
        );
    }

    #[test]
    fn test_send_polls_the_suffixed_queue_with_configured_timeout() {
        let transport = Arc::new(ScriptedTransport::with_json(vec![json!({"EOF": true})]));
        let client = Client::new(transport.clone(), &config());

        client
            .send("q", &json!({}), &RequestOptions::new().suffix("7"))
            .unwrap();

        assert!(transport.calls().contains(&TransportCall::Get {
            queue: "resp-7".to_string(),
            timeout: Duration::from_millis(50),
        }));
        assert_eq!(transport.deleted_queues(), vec!["resp-7".to_string()]);
    }

    #[test]
    fn test_send_treats_timeout_as_end_of_stream() {
        let transport = Arc::new(ScriptedTransport::with_json(vec![json!({"row": 1})]));
        let client = Client::new(transport.clone(), &config());

        let response = client
            .send_detailed("q", &json!({}), &RequestOptions::new())
            .unwrap();

        assert_eq!(response.messages, vec![json!({"row": 1})]);
        assert_eq!(response.end, StreamEnd::TimedOut);
        assert!(response.may_be_incomplete());
        assert!(response.released);
    }

    #[test]
    fn test_send_passes_expiration_to_put() {
        let transport = Arc::new(ScriptedTransport::with_json(vec![json!({"EOF": true})]));
        let client = Client::new(transport.clone(), &config());
        let options = RequestOptions::new().expiration(Duration::from_secs(90));

        client.send("q", &json!({}), &options).unwrap();

        match &transport.calls()[0] {
            TransportCall::Put { expiration, .. } => {
                assert_eq!(*expiration, Some(Duration::from_secs(90)))
            }
            other => panic!("expected put first, got {:?}", other),
        }
    }

    #[test]
    fn test_rejected_put_aborts_without_polling() {
        let transport = Arc::new(ScriptedTransport::with_json(vec![json!({"row": 1})]));
        transport.set_put_behavior(MockBehavior::Reject);
        let client = Client::new(transport.clone(), &config());

        let err = client
            .send("q", &json!({}), &RequestOptions::new())
            .unwrap_err();

        assert!(matches!(err, ClientError::SendAborted { ref queue, .. } if queue == "q"));
        assert_eq!(transport.get_count(), 0);
    }

    #[test]
    fn test_delete_failure_is_not_fatal() {
        let transport = Arc::new(ScriptedTransport::with_json(vec![
            json!({"row": 1}),
            json!({"EOF": true}),
        ]));
        transport.set_delete_behavior(MockBehavior::Fail("server gone".to_string()));
        let client = Client::new(transport.clone(), &config());

        let response = client
            .send_detailed("q", &json!({}), &RequestOptions::new())
            .unwrap();

        assert_eq!(response.messages.len(), 1);
        assert!(!response.released);
    }

    #[test]
    fn test_corrupt_payload_is_fatal_but_queue_is_released() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_raw(b"\x00\x01 definitely not json".to_vec());
        let client = Client::new(transport.clone(), &config());

        let err = client
            .send("q", &json!({}), &RequestOptions::new())
            .unwrap_err();

        assert!(matches!(err, ClientError::Decode(_)), "got {:?}", err);
        assert_eq!(transport.deleted_queues().len(), 1);
    }

    #[test]
    fn test_per_message_acknowledgement() {
        let transport = Arc::new(ScriptedTransport::with_json(vec![
            json!({"row": 1}),
            json!({"row": 2}),
            json!({"EOF": true}),
        ]));
        let config = ClientConfig {
            acknowledgement: Acknowledgement::PerMessage,
            ..config()
        };
        let client = Client::new(transport.clone(), &config);

        client.send("q", &json!({}), &RequestOptions::new()).unwrap();

        assert_eq!(transport.confirm_count(), 3);
    }

    #[test]
    fn test_iterate_does_not_poll() {
        let transport = Arc::new(ScriptedTransport::with_json(vec![json!({"row": 1})]));
        let client = Client::new(transport.clone(), &config());

        let results = client
            .iterate("q", &json!({}), &RequestOptions::new().suffix("it"), None)
            .unwrap();

        assert_eq!(transport.get_count(), 0);
        assert_eq!(results.batch_size(), 25);
        assert_eq!(results.response_queue(), "resp-it");
        results.finished();
    }

    #[test]
    fn test_iterate_rejects_zero_batch() {
        let transport = Arc::new(ScriptedTransport::new());
        let client = Client::new(transport.clone(), &config());

        let result = client.iterate(
            "q",
            &json!({}),
            &RequestOptions::new(),
            Some(BatchOptions::new(0)),
        );

        assert!(matches!(result, Err(ClientError::InvalidRequest(_))));
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn test_put_transport_error_aborts() {
        let mut transport = MockQueueTransport::new();
        transport
            .expect_put()
            .withf(|queue, _, expiration| queue == "jobs" && expiration.is_none())
            .times(1)
            .returning(|_, _, _| Err(TransportError::Connection("refused".to_string())));
        transport.expect_get().times(0);
        transport.expect_delete().times(0);

        let client = Client::new(Arc::new(transport), &config());
        let err = client
            .send("jobs", &json!({"statement": "x"}), &RequestOptions::new())
            .unwrap_err();

        match err {
            ClientError::SendAborted { queue, reason } => {
                assert_eq!(queue, "jobs");
                assert!(reason.contains("refused"));
            }
            other => panic!("expected send aborted, got {:?}", other),
        }
    }

    #[test]
    fn test_get_error_still_releases_queue() {
        let mut transport = MockQueueTransport::new();
        transport.expect_put().returning(|_, _, _| Ok(true));
        transport
            .expect_get()
            .times(1)
            .returning(|_, _| Err(TransportError::Server("broken pipe".to_string())));
        transport
            .expect_delete()
            .withf(|queue| queue == "resp-")
            .times(1)
            .returning(|_| Ok(true));

        let client = Client::new(Arc::new(transport), &config());
        let err = client
            .send("q", &json!({}), &RequestOptions::new())
            .unwrap_err();

        assert!(matches!(err, ClientError::Transport(_)));
    }
}
