//! # VCL Common Library
//!
//! Shared code for the voice channel looper:
//! - Error type used across crates
//! - Configuration file loading and setting resolution
//! - Logging initialization
//! - Event types (BotEvent enum) and the EventBus

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
pub use events::{BotEvent, EventBus, PlayerStatus};
