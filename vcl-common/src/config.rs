//! Configuration file loading and setting resolution
//!
//! Every setting is resolved with the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (clap merges 1 and 2 before we see them)
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Application directory name under the platform config dir
pub const APP_NAME: &str = "vcl";

/// Audio asset played in a loop, relative to the working directory
pub const DEFAULT_ASSET_PATH: &str = "./assets/royalty.ogg";

/// Delay between channel resolution attempts
pub const DEFAULT_RETRY_DELAY_MS: u64 = 5000;

/// Default log level for the vcl crates
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Contents of `config.toml`
///
/// All keys are optional; anything missing falls through to compiled defaults
/// or, for required settings, to a configuration error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// Chat platform bot token
    pub token: Option<String>,
    /// Target voice channel id
    pub channel_id: Option<IdSetting>,
    /// Audio asset path
    pub asset_path: Option<PathBuf>,
    /// Delay between channel resolution attempts (milliseconds)
    pub retry_delay_ms: Option<u64>,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: Option<String>,
}

/// An id as written in the config file, either `123` or `"123"`
///
/// Kept verbatim; whether it names anything is decided at lookup time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum IdSetting {
    Number(i64),
    Text(String),
}

impl fmt::Display for IdSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdSetting::Number(n) => write!(f, "{}", n),
            IdSetting::Text(s) => f.write_str(s),
        }
    }
}

impl TomlConfig {
    /// Load and parse a config file that must exist
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parse TOML text
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load the config file from an explicit path, or from the platform default
    /// location when no path is given.
    ///
    /// An explicit path must exist and parse. A missing default file is not an
    /// error (defaults are used); an unparsable default file is logged and ignored.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            debug!("Loading config file {}", path.display());
            return Self::load(path);
        }

        match default_config_file() {
            Some(path) => match Self::load(&path) {
                Ok(config) => {
                    debug!("Loaded config file {}", path.display());
                    Ok(config)
                }
                Err(e) => {
                    warn!("Ignoring config file {}: {}", path.display(), e);
                    Ok(Self::default())
                }
            },
            None => Ok(Self::default()),
        }
    }
}

/// Locate the default config file for the platform, if one exists.
///
/// Linux checks `~/.config/vcl/config.toml` then `/etc/vcl/config.toml`;
/// other platforms check only the user config directory.
pub fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join(APP_NAME).join("config.toml"));
    if let Some(path) = user_config {
        if path.is_file() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc").join(APP_NAME).join("config.toml");
        if system_config.is_file() {
            return Some(system_config);
        }
    }

    None
}

/// Pick the first present value in priority order, or the default
pub fn resolve_setting<T>(cli: Option<T>, file: Option<T>, default: T) -> T {
    cli.or(file).unwrap_or(default)
}

/// Pick the first present value in priority order; absence is a configuration error
pub fn resolve_required<T>(name: &str, cli: Option<T>, file: Option<T>) -> Result<T> {
    cli.or(file).ok_or_else(|| {
        Error::Config(format!(
            "{} is required (command line, environment, or config file)",
            name
        ))
    })
}

/// Parse a platform snowflake id (non-zero unsigned 64-bit integer)
pub fn parse_snowflake(name: &str, value: &str) -> Result<u64> {
    let trimmed = value.trim();
    match trimmed.parse::<u64>() {
        Ok(0) => Err(Error::InvalidInput(format!("{} must not be zero", name))),
        Ok(id) => Ok(id),
        Err(_) => Err(Error::InvalidInput(format!(
            "{} must be a numeric id, got {:?}",
            name, trimmed
        ))),
    }
}

/// Resolve a possibly relative path against a base directory
pub fn resolve_relative(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
