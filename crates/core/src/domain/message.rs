// Response Message Domain Model

use serde_json::Value;

/// Key that marks the end of a response stream
pub const EOF_KEY: &str = "EOF";

/// One decoded unit read from a response queue
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseMessage {
    /// A result produced by a worker
    Data(Value),
    /// Termination sentinel; nothing after it is meaningful
    Eof,
}

impl ResponseMessage {
    pub fn from_value(value: Value) -> Self {
        if is_eof_sentinel(&value) {
            ResponseMessage::Eof
        } else {
            ResponseMessage::Data(value)
        }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self, ResponseMessage::Eof)
    }
}

/// True when `value` is an object holding exactly one key, `EOF`.
///
/// The value stored under the key is never inspected.
pub fn is_eof_sentinel(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.len() == 1 && map.contains_key(EOF_KEY),
        _ => false,
    }
}

/// Why a response stream stopped being consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The EOF sentinel was received
    Eof,
    /// `get` returned nothing within the poll timeout; the stream may be incomplete
    TimedOut,
}

impl std::fmt::Display for StreamEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamEnd::Eof => write!(f, "EOF"),
            StreamEnd::TimedOut => write!(f, "TIMED_OUT"),
        }
    }
}
