//! Tracing subscriber setup shared by VCL binaries

use crate::{Error, Result};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the default filter directives for a log level.
///
/// Our crates log at `level`; the gateway and voice libraries are kept at
/// `warn` because their `info` output is per-packet noisy.
pub fn default_directives(level: &str) -> Result<String> {
    let level: Level = level
        .trim()
        .parse()
        .map_err(|_| Error::InvalidInput(format!("Unknown log level: {:?}", level)))?;
    let level = level.as_str().to_ascii_lowercase();

    Ok(format!(
        "vcl_bot={level},vcl_common={level},songbird=warn,serenity=warn"
    ))
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `directives` when set.
pub fn init(directives: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| Error::Internal(format!("Failed to install tracing subscriber: {}", e)))
}
