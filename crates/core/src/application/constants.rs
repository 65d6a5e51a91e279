// Client constants (No magic values)
use std::time::Duration;

/// Default response queue prefix
pub const DEFAULT_RESPONSE_QUEUE_PREFIX: &str = "response-net-kestrel-";

/// Default queue server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default Kestrel memcache-protocol port
pub const DEFAULT_PORT: u16 = 22133;

/// Default wait for one `get` on a response queue (30s)
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default number of messages per iterator batch
pub const DEFAULT_BATCH_SIZE: usize = 25;

/// Extra socket read allowance on top of the poll timeout (5s)
pub const DEFAULT_IO_TIMEOUT_MS: u64 = 5_000;

/// Default poll timeout as a Duration
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(DEFAULT_TIMEOUT_MS);
