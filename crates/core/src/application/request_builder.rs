// Request Builder - envelope construction and response queue naming

use crate::domain::{Envelope, QueueName, DEADLINE_FIELD, RESPONSE_QUEUE_FIELD, TRACE_ID_FIELD};
use crate::error::{ClientError, Result};
use crate::port::IdProvider;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Per-request options
///
/// # Example
/// ```text
/// let options = RequestOptions::new()
///     .suffix("report-42")
///     .traced()
///     .expiration(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Appended to the response queue prefix; required for concurrent requests
    pub suffix: Option<String>,
    /// Attach a freshly generated trace id
    pub trace: bool,
    pub deadline: Option<DateTime<Utc>>,
    /// Server-side lifetime of the request item
    pub expiration: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn traced(mut self) -> Self {
        self.trace = true;
        self
    }

    pub fn deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn expiration(mut self, expiration: Duration) -> Self {
        self.expiration = Some(expiration);
        self
    }
}

/// Builds envelopes bound to a response queue prefix
#[derive(Clone)]
pub struct RequestBuilder {
    prefix: String,
    id_provider: Arc<dyn IdProvider>,
}

impl RequestBuilder {
    pub fn new(prefix: impl Into<String>, id_provider: Arc<dyn IdProvider>) -> Self {
        Self {
            prefix: prefix.into(),
            id_provider,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Response queue name: prefix followed by the suffix, if any
    pub fn queue_name(&self, suffix: Option<&str>) -> QueueName {
        match suffix {
            Some(suffix) => format!("{}{}", self.prefix, suffix),
            None => self.prefix.clone(),
        }
    }

    /// Serialize `payload` into an envelope
    ///
    /// The payload is copied into a new JSON object before the response
    /// queue, trace id and deadline fields are inserted.
    ///
    /// # Errors
    /// - ClientError::Serialization if the payload cannot be serialized
    /// - ClientError::InvalidRequest if it does not serialize to a JSON object
    pub fn prepare<T>(&self, payload: &T, options: &RequestOptions) -> Result<Envelope>
    where
        T: Serialize + ?Sized,
    {
        let queue_name = self.queue_name(options.suffix.as_deref());

        let mut fields = match serde_json::to_value(payload)? {
            Value::Object(map) => map,
            other => {
                return Err(ClientError::InvalidRequest(format!(
                    "request payload must be a JSON object, got {}",
                    json_kind(&other)
                )))
            }
        };

        fields.insert(
            RESPONSE_QUEUE_FIELD.to_string(),
            Value::String(queue_name.clone()),
        );

        let trace_id = if options.trace {
            let id = self.id_provider.generate_id();
            fields.insert(TRACE_ID_FIELD.to_string(), Value::String(id.clone()));
            Some(id)
        } else {
            None
        };

        if let Some(deadline) = options.deadline {
            fields.insert(
                DEADLINE_FIELD.to_string(),
                Value::String(deadline.to_rfc3339_opts(SecondsFormat::Millis, true)),
            );
        }

        let body = serde_json::to_vec(&Value::Object(fields))?;
        Ok(Envelope::new(queue_name, trace_id, body))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
