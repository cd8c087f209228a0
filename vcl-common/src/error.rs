//! Common error types for VCL

use thiserror::Error;

/// Common result type for VCL operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the VCL crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Config file exists but is not valid TOML for our schema
    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid user input or setting value
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
