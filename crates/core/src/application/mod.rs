// Application Layer - Protocol use cases

pub mod client;
pub mod constants;
pub mod decoder;
pub mod iterator;
pub mod request_builder;
pub mod response_queue;

// Re-exports
pub use client::{Client, Response};
pub use decoder::{decode, decode_message};
pub use iterator::{BatchOptions, IteratorState, ResponseIterator};
pub use request_builder::{RequestBuilder, RequestOptions};
pub use response_queue::{Poll, ResponseQueue};
