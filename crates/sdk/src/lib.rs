//! Kestrel-Net SDK - Rust Client Library
//!
//! Sends requests to a worker pool through a Kestrel queue and collects the
//! streamed results from a per-request response queue.
//!
//! # Example
//!
//! ```no_run
//! use kestrel_net_sdk::{ClientConfig, KestrelNetClient, RequestOptions};
//! use serde_json::json;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = KestrelNetClient::connect(ClientConfig::default())?;
//!
//!     // Collect everything at once
//!     let rows = client.send("queries", &json!({"statement": "select 1"}))?;
//!     println!("{} rows", rows.len());
//!
//!     // Or stream in batches of 10
//!     let options = RequestOptions::new().suffix("batch-1").traced();
//!     let request = json!({"statement": "select 2"});
//!     let mut results = client.iterate("queries", &request, &options, Some(10))?;
//!     while !results.is_done() {
//!         for row in results.get_more()? {
//!             println!("{}", row);
//!         }
//!     }
//!     results.finished();
//!
//!     Ok(())
//! }
//! ```

mod client;
mod error;
pub mod logging;

pub use client::KestrelNetClient;
pub use error::{Result, SdkError};
pub use kestrel_net_core::application::{RequestOptions, Response};
pub use kestrel_net_core::domain::StreamEnd;
pub use kestrel_net_core::port::{QueueTransport, TransportError};
pub use kestrel_net_core::{Acknowledgement, ClientConfig, ClientError, ResponseIterator};
pub use kestrel_net_infra_queue::{KestrelTransport, MemoryTransport};
