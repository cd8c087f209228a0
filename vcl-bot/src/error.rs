//! Error types for vcl-bot
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use crate::channel::{ChannelId, ChannelKind};
use crate::retry::Retryable;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for vcl-bot
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration, TOML, and other shared errors
    #[error(transparent)]
    Common(#[from] vcl_common::Error),

    /// No such channel; carries the id as configured, which may not parse
    #[error("Channel not found: {0:?}")]
    ChannelNotFound(String),

    /// Channel exists but is not a voice channel
    #[error("Channel {id} is not a voice channel (found {kind})")]
    WrongChannelType { id: ChannelId, kind: ChannelKind },

    /// Network or API error talking to the platform
    #[error("Transport error: {0}")]
    Transport(String),

    /// Gateway client errors
    #[error("Discord client error: {0}")]
    Discord(#[from] serenity::Error),

    /// Voice session errors (join, rejoin, mute/deafen)
    #[error("Voice error: {0}")]
    Voice(String),

    /// Audio player / sink errors
    #[error("Player error: {0}")]
    Player(String),

    /// Audio asset missing or not streamable
    #[error("Audio asset {path}: {reason}")]
    Asset { path: PathBuf, reason: String },

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bounded retry policy gave up
    #[error("{operation} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        last: Box<Error>,
    },
}

/// Convenience Result type using vcl-bot Error
pub type Result<T> = std::result::Result<T, Error>;

impl Retryable for Error {
    /// Resolution and transport failures are transient; configuration and
    /// asset problems will not fix themselves by waiting.
    fn is_retryable(&self) -> bool {
        match self {
            Error::ChannelNotFound(_)
            | Error::WrongChannelType { .. }
            | Error::Transport(_)
            | Error::Discord(_)
            | Error::Voice(_)
            | Error::Io(_) => true,
            Error::Common(_)
            | Error::Player(_)
            | Error::Asset { .. }
            | Error::RetriesExhausted { .. } => false,
        }
    }
}
