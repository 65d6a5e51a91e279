//! Simple SDK Example
//!
//! Demonstrates a full request/response exchange against an in-process
//! worker, then the same request consumed in batches.
//!
//! # Usage
//!
//! ```bash
//! KESTREL_NET_LOG_FORMAT=pretty RUST_LOG=kestrel_net=debug \
//!     cargo run --package kestrel-net-sdk --example simple
//! ```

use kestrel_net_sdk::{
    ClientConfig, KestrelNetClient, MemoryTransport, QueueTransport, RequestOptions,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const REQUEST_QUEUE: &str = "queries";

/// Answer one request with `rows` rows followed by EOF
fn serve_one(transport: Arc<MemoryTransport>, rows: usize) -> anyhow::Result<()> {
    let request = transport
        .get(REQUEST_QUEUE, Duration::from_secs(5))?
        .ok_or_else(|| anyhow::anyhow!("no request arrived"))?;
    let request: Value = serde_json::from_slice(&request)?;
    let reply_to = request["response_queue"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("request has no response_queue"))?
        .to_string();

    for i in 1..=rows {
        let row = json!({"row": i, "statement": request["statement"]});
        transport.put(&reply_to, row.to_string().as_bytes(), None)?;
    }
    transport.put(&reply_to, br#"{"EOF":true}"#, None)?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    kestrel_net_sdk::logging::init()?;

    println!("Kestrel-Net SDK - Simple Example");
    println!("================================\n");

    // 1. Wire a client to an in-process transport
    let transport = Arc::new(MemoryTransport::new());
    let config = ClientConfig {
        timeout: Duration::from_secs(2),
        ..Default::default()
    };
    let client = KestrelNetClient::with_transport(transport.clone(), config)?;

    // 2. Synchronous send: collect everything
    println!("1. Sending request...");
    let worker = {
        let transport = transport.clone();
        thread::spawn(move || serve_one(transport, 3))
    };
    let options = RequestOptions::new().suffix("simple-1").traced();
    let request = json!({"statement": "select *"});
    let rows = client.send_with(REQUEST_QUEUE, &request, &options)?;
    worker
        .join()
        .map_err(|_| anyhow::anyhow!("worker panicked"))??;

    println!("   ✓ Received {} rows:", rows.len());
    for row in &rows {
        println!("     | {}", row);
    }
    println!();

    // 3. Iterator: consume in batches of 4
    println!("2. Streaming request in batches...");
    let worker = {
        let transport = transport.clone();
        thread::spawn(move || serve_one(transport, 10))
    };
    let options = RequestOptions::new().suffix("simple-2");
    let request = json!({"statement": "scan"});
    let mut results = client.iterate(REQUEST_QUEUE, &request, &options, Some(4))?;
    while !results.is_done() {
        let batch = results.get_more()?;
        println!("   ✓ Batch of {}", batch.len());
    }
    println!("   ✓ Stream ended: {:?}", results.end_reason());
    results.finished();
    worker
        .join()
        .map_err(|_| anyhow::anyhow!("worker panicked"))??;

    println!("\n✓ Example completed successfully!");

    Ok(())
}
