// Client Configuration

use crate::application::constants::*;
use crate::error::{ClientError, Result};
use std::str::FromStr;
use std::time::Duration;

pub const ENV_HOST: &str = "KESTREL_NET_HOST";
pub const ENV_PORT: &str = "KESTREL_NET_PORT";
pub const ENV_RESPONSE_QUEUE_PREFIX: &str = "KESTREL_NET_RESPONSE_QUEUE_PREFIX";
pub const ENV_TIMEOUT_MS: &str = "KESTREL_NET_TIMEOUT_MS";
pub const ENV_BATCH_SIZE: &str = "KESTREL_NET_BATCH_SIZE";
pub const ENV_ACK: &str = "KESTREL_NET_ACK";
pub const ENV_IO_TIMEOUT_MS: &str = "KESTREL_NET_IO_TIMEOUT_MS";

/// When the client acknowledges received messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Acknowledgement {
    /// Never call `confirm`
    #[default]
    Never,
    /// Call `confirm` after every message read from a response queue
    PerMessage,
}

impl FromStr for Acknowledgement {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "never" | "none" | "off" => Ok(Acknowledgement::Never),
            "per_message" | "per-message" | "always" => Ok(Acknowledgement::PerMessage),
            other => Err(ClientError::Config(format!(
                "unknown acknowledgement mode '{}'",
                other
            ))),
        }
    }
}

/// Client Configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub response_queue_prefix: String,
    /// Wait for each `get` on a response queue
    pub timeout: Duration,
    pub batch_size: usize,
    pub acknowledgement: Acknowledgement,
    /// Socket allowance beyond `timeout` for transports doing network I/O
    pub io_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            response_queue_prefix: DEFAULT_RESPONSE_QUEUE_PREFIX.to_string(),
            timeout: DEFAULT_TIMEOUT,
            batch_size: DEFAULT_BATCH_SIZE,
            acknowledgement: Acknowledgement::Never,
            io_timeout: Duration::from_millis(DEFAULT_IO_TIMEOUT_MS),
        }
    }
}

impl ClientConfig {
    /// Load configuration from `KESTREL_NET_*` environment variables
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup(ENV_HOST) {
            config.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            config.port = parse_value(ENV_PORT, &port)?;
        }
        if let Some(prefix) = lookup(ENV_RESPONSE_QUEUE_PREFIX) {
            config.response_queue_prefix = prefix;
        }
        if let Some(ms) = lookup(ENV_TIMEOUT_MS) {
            config.timeout = Duration::from_millis(parse_value(ENV_TIMEOUT_MS, &ms)?);
        }
        if let Some(size) = lookup(ENV_BATCH_SIZE) {
            config.batch_size = parse_value(ENV_BATCH_SIZE, &size)?;
        }
        if let Some(ack) = lookup(ENV_ACK) {
            config.acknowledgement = ack.parse()?;
        }
        if let Some(ms) = lookup(ENV_IO_TIMEOUT_MS) {
            config.io_timeout = Duration::from_millis(parse_value(ENV_IO_TIMEOUT_MS, &ms)?);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ClientError::Config("host cannot be empty".to_string()));
        }
        if self.response_queue_prefix.is_empty() {
            return Err(ClientError::Config(
                "response queue prefix cannot be empty".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ClientError::Config(
                "batch size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// `host:port` socket address string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| ClientError::Config(format!("{} has invalid value '{}'", key, raw)))
}
