//! Structured logging using **tracing**.
//!
//! Every recover-and-log point in the pipeline emits a `tracing` event with
//! structured fields (`path`, `error`, counts). The subscriber is installed
//! by the binary; the library never installs one itself.

use serde::Deserialize;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

use crate::error::RpcmapError;

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Machine-readable JSON lines
    #[default]
    Json,
    /// Human-readable single-line text
    Text,
}

impl FromStr for LogFormat {
    type Err = RpcmapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            other => Err(RpcmapError::invalid_argument(format!(
                "unknown log format '{}' (expected json or text)",
                other
            ))),
        }
    }
}

/// Initializes the global tracing collector (subscriber).
///
/// This should be called *once* at the beginning of the application's runtime.
/// Output goes to stderr so stdout stays clean for `-o -`.
///
/// # Environment Variables
/// - `RUST_LOG`: Controls log filtering (e.g., `RUST_LOG=rpcmap_core=debug`),
///   defaults to `info`
pub fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_ansi(false)
            .with_level(true)
            .with_target(true)
            .with_current_span(true)
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_level(true)
            .with_target(false)
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}
