// Kestrel-Net Core - Protocol Logic & Ports
// NO transport implementations here (sockets live in infra-queue)

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod port;

pub use application::{Client, ResponseIterator};
pub use config::{Acknowledgement, ClientConfig};
pub use error::{ClientError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
