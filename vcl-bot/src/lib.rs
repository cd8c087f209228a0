//! # VCL Bot Library (vcl-bot)
//!
//! Keeps one voice session and one looping audio stream alive in a single
//! Discord voice channel across any number of gateway reconnects.
//!
//! **Architecture:** platform-neutral core (channel resolution, voice
//! connection, playback state machine, subscription binding, session
//! orchestration) behind traits, plus serenity/songbird adapters in
//! [`discord`].

pub mod asset;
pub mod channel;
pub mod config;
pub mod discord;
pub mod error;
pub mod playback;
pub mod retry;
pub mod session;
pub mod state;
pub mod subscription;
pub mod voice;

pub use channel::{ChannelId, ChannelResolver, GuildId, VoiceChannel};
pub use config::BotConfig;
pub use error::{Error, Result};
pub use playback::{AudioPlayer, AudioResource, PlaybackEngine};
pub use session::SessionManager;
pub use subscription::Subscription;
