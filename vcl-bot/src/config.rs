//! Bot configuration
//!
//! Merges command-line/environment overrides with the TOML config file and
//! compiled defaults into one [`BotConfig`].
//!
//! The channel id is carried as configured. A missing or malformed id does
//! not stop startup; channel resolution reports it as not found and retries.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use vcl_common::config::{
    resolve_relative, resolve_required, resolve_setting, TomlConfig, DEFAULT_ASSET_PATH,
    DEFAULT_LOG_LEVEL, DEFAULT_RETRY_DELAY_MS,
};

use crate::error::Result;
use crate::retry::RetryPolicy;

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub token: Option<String>,
    pub channel_id: Option<String>,
    pub asset_path: Option<PathBuf>,
    pub retry_delay_ms: Option<u64>,
    pub log_level: Option<String>,
    /// Explicit config file; must exist when given
    pub config_file: Option<PathBuf>,
}

/// Fully resolved runtime configuration
#[derive(Clone)]
pub struct BotConfig {
    pub token: String,
    /// Voice channel id as configured; empty when none was given
    pub channel_id: String,
    /// Absolute path of the looped audio asset
    pub asset_path: PathBuf,
    pub retry_delay: Duration,
    pub log_level: String,
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &"<redacted>")
            .field("channel_id", &self.channel_id)
            .field("asset_path", &self.asset_path)
            .field("retry_delay", &self.retry_delay)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl BotConfig {
    /// Resolve against the config file named in `overrides`, or the
    /// platform default file
    pub fn resolve(overrides: &ConfigOverrides) -> Result<Self> {
        let file = TomlConfig::load_or_default(overrides.config_file.as_deref())?;
        let cwd = std::env::current_dir()?;
        Self::from_sources(overrides, file, cwd)
    }

    /// Merge already-loaded sources; relative asset paths resolve against `cwd`
    pub fn from_sources(
        overrides: &ConfigOverrides,
        file: TomlConfig,
        cwd: PathBuf,
    ) -> Result<Self> {
        let token = resolve_required(
            "token",
            non_empty(overrides.token.clone()),
            non_empty(file.token),
        )?;

        let channel_id = resolve_setting(
            non_empty(overrides.channel_id.clone()),
            file.channel_id.map(|id| id.to_string()),
            String::new(),
        );

        let asset_path = resolve_setting(
            overrides.asset_path.clone(),
            file.asset_path,
            PathBuf::from(DEFAULT_ASSET_PATH),
        );
        let retry_delay_ms = resolve_setting(
            overrides.retry_delay_ms,
            file.retry_delay_ms,
            DEFAULT_RETRY_DELAY_MS,
        );
        let log_level = resolve_setting(
            overrides.log_level.clone(),
            file.log_level,
            DEFAULT_LOG_LEVEL.to_string(),
        );

        Ok(Self {
            token,
            channel_id,
            asset_path: resolve_relative(&asset_path, &cwd),
            retry_delay: Duration::from_millis(retry_delay_ms),
            log_level,
        })
    }

    /// Unbounded retry at the configured delay
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::unbounded(self.retry_delay)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
