//! Voice Channel Looper (vcl-bot) - Main entry point
//!
//! Joins one Discord voice channel and streams a looped audio file there
//! for as long as the process runs, re-establishing the voice connection
//! after every gateway reconnect.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use vcl_common::config::DEFAULT_LOG_LEVEL;
use vcl_common::logging;

use vcl_bot::asset::probe_asset;
use vcl_bot::config::{BotConfig, ConfigOverrides};
use vcl_bot::discord;

/// Command-line arguments for vcl-bot
#[derive(Parser, Debug)]
#[command(name = "vcl-bot")]
#[command(about = "Loops an audio file in a Discord voice channel")]
#[command(version)]
struct Args {
    /// Discord bot token
    #[arg(long, env = "TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Voice channel to join
    #[arg(short, long, env = "CHANNEL_ID")]
    channel_id: Option<String>,

    /// Ogg/Opus file to loop
    #[arg(short, long, env = "VCL_ASSET_PATH")]
    asset_path: Option<PathBuf>,

    /// Delay between channel lookup attempts (milliseconds)
    #[arg(long, env = "VCL_RETRY_DELAY_MS")]
    retry_delay_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "VCL_LOG")]
    log_level: Option<String>,

    /// Config file (default: ~/.config/vcl/config.toml, then /etc/vcl/config.toml)
    #[arg(long, env = "VCL_CONFIG")]
    config: Option<PathBuf>,
}

impl From<Args> for ConfigOverrides {
    fn from(args: Args) -> Self {
        Self {
            token: args.token,
            channel_id: args.channel_id,
            asset_path: args.asset_path,
            retry_delay_ms: args.retry_delay_ms,
            log_level: args.log_level,
            config_file: args.config,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    match run(args.into()).await {
        Ok(()) => info!("Done"),
        Err(e) => error!("Fatal error: {:#}", e),
    }
}

async fn run(overrides: ConfigOverrides) -> Result<()> {
    let config = match BotConfig::resolve(&overrides) {
        Ok(config) => config,
        Err(e) => {
            init_logging(overrides.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL));
            return Err(e).context("Failed to load configuration");
        }
    };
    init_logging(&config.log_level);

    info!("Starting vcl-bot {}", env!("CARGO_PKG_VERSION"));
    if config.channel_id.is_empty() {
        warn!("No voice channel id configured; channel lookup will keep retrying");
    } else {
        info!("Voice channel: {}", config.channel_id);
    }

    probe_asset(&config.asset_path).context("Audio asset check failed")?;

    discord::run(config).await.context("Discord client failed")?;
    Ok(())
}

/// Install the subscriber, falling back to the default level when `level`
/// is not a valid level name
fn init_logging(level: &str) {
    let directives = logging::default_directives(level).or_else(|e| {
        eprintln!("{}; using log level {}", e, DEFAULT_LOG_LEVEL);
        logging::default_directives(DEFAULT_LOG_LEVEL)
    });

    match directives {
        Ok(directives) => {
            if let Err(e) = logging::init(&directives) {
                eprintln!("Failed to initialize logging: {}", e);
            }
        }
        Err(e) => eprintln!("Failed to initialize logging: {}", e),
    }
}
