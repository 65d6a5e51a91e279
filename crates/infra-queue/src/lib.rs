// Kestrel-Net Infrastructure - Queue Transport Adapters
// Implements: QueueTransport (Kestrel memcache protocol, in-memory)

mod connection;
mod kestrel_transport;
mod memory_transport;

pub use connection::{connect, Connection};
pub use kestrel_transport::KestrelTransport;
pub use memory_transport::MemoryTransport;
