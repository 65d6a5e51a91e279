//! Logging setup for applications embedding the SDK

use crate::error::{Result, SdkError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Selects `json` or `pretty` output
pub const ENV_LOG_FORMAT: &str = "KESTREL_NET_LOG_FORMAT";

const DEFAULT_FILTER: &str = "kestrel_net=info";

/// Install a global `tracing` subscriber
///
/// # Environment Variables
///
/// - `RUST_LOG`: filter directives (default: `kestrel_net=info`)
/// - `KESTREL_NET_LOG_FORMAT`: `json` for structured output, anything else
///   for pretty console output
pub fn init() -> Result<()> {
    let log_format = std::env::var(ENV_LOG_FORMAT).unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .map_err(|e| SdkError::Logging(e.to_string()))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = match log_format.as_str() {
        "json" => registry.with(fmt::layer().json()).try_init(),
        _ => registry.with(fmt::layer().pretty()).try_init(),
    };

    installed.map_err(|e| SdkError::Logging(e.to_string()))
}
