//! Channel resolution
//!
//! Turns the configured channel id into a [`VoiceChannel`], retrying with a
//! fixed delay until the platform hands back a voice channel. Under the
//! default policy [`ChannelResolver::resolve`] only returns once it has one.
//!
//! The configured id is kept as given. An empty or malformed id is just a
//! channel that cannot be found, and is retried like any other lookup miss.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};
use vcl_common::config::parse_snowflake;
use vcl_common::{BotEvent, EventBus};

use crate::error::{Error, Result};
use crate::retry::{retry, RetryPolicy, Sleeper};

/// Platform channel id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(u64);

impl ChannelId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// Parse a configured id; `None` for anything that is not a non-zero integer
    pub fn parse(raw: &str) -> Option<Self> {
        parse_snowflake("channel_id", raw).ok().map(Self)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Platform guild (group) id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuildId(u64);

impl GuildId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for GuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of channel as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Voice,
    Stage,
    Text,
    Category,
    Private,
    Other,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Voice => write!(f, "voice"),
            ChannelKind::Stage => write!(f, "stage"),
            ChannelKind::Text => write!(f, "text"),
            ChannelKind::Category => write!(f, "category"),
            ChannelKind::Private => write!(f, "private"),
            ChannelKind::Other => write!(f, "other"),
        }
    }
}

/// Channel object as fetched from the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: ChannelId,
    /// Parent guild; `None` for private channels
    pub guild_id: Option<GuildId>,
    pub kind: ChannelKind,
    pub name: String,
}

/// A channel known to be a guild voice channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceChannel {
    pub id: ChannelId,
    pub guild_id: GuildId,
    pub name: String,
}

impl TryFrom<ChannelInfo> for VoiceChannel {
    type Error = Error;

    fn try_from(info: ChannelInfo) -> Result<Self> {
        if info.kind != ChannelKind::Voice {
            return Err(Error::WrongChannelType {
                id: info.id,
                kind: info.kind,
            });
        }

        // A voice channel outside a guild has nothing to join through
        let guild_id = info
            .guild_id
            .ok_or_else(|| Error::ChannelNotFound(info.id.to_string()))?;

        Ok(VoiceChannel {
            id: info.id,
            guild_id,
            name: info.name,
        })
    }
}

/// Channel lookup on the chat platform
#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    /// Fetch a channel by id. `Ok(None)` means the platform has no such channel.
    async fn fetch_channel(&self, id: ChannelId) -> Result<Option<ChannelInfo>>;
}

/// Resolves the configured channel id to a voice channel
pub struct ChannelResolver {
    directory: Arc<dyn ChannelDirectory>,
    /// Channel id exactly as configured
    configured_id: String,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    events: Arc<EventBus>,
}

impl ChannelResolver {
    pub fn new(
        directory: Arc<dyn ChannelDirectory>,
        configured_id: impl Into<String>,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            directory,
            configured_id: configured_id.into(),
            policy,
            sleeper,
            events,
        }
    }

    /// Single fetch-and-validate attempt
    pub async fn fetch_once(&self) -> Result<VoiceChannel> {
        let not_found = || Error::ChannelNotFound(self.configured_id.clone());

        let id = ChannelId::parse(&self.configured_id).ok_or_else(not_found)?;
        let info = self
            .directory
            .fetch_channel(id)
            .await?
            .ok_or_else(not_found)?;
        VoiceChannel::try_from(info)
    }

    /// Resolve the voice channel, retrying per policy.
    ///
    /// With the default unbounded policy this never returns `Err`; it can
    /// suspend for arbitrarily long.
    pub async fn resolve(&self) -> Result<VoiceChannel> {
        let result = retry(
            &self.policy,
            self.sleeper.as_ref(),
            "getting voice channel",
            |_| self.fetch_once(),
            |attempt, error| {
                self.events.emit_lossy(BotEvent::RetryScheduled {
                    operation: "resolve_channel".to_string(),
                    attempt,
                    delay_ms: self.policy.delay_ms(),
                    error: error.to_string(),
                    timestamp: chrono::Utc::now(),
                });
            },
        )
        .await;

        match result {
            Ok(channel) => {
                info!(
                    channel_id = %channel.id,
                    guild_id = %channel.guild_id,
                    "Resolved voice channel {:?}",
                    channel.name
                );
                self.events.emit_lossy(BotEvent::ChannelResolved {
                    channel_id: channel.id.get(),
                    guild_id: channel.guild_id.get(),
                    name: channel.name.clone(),
                    timestamp: chrono::Utc::now(),
                });
                Ok(channel)
            }
            // Only a bounded policy ends up here
            Err(failure) => {
                error!(
                    "Giving up on voice channel {:?} after {} attempts: {}",
                    self.configured_id, failure.attempts, failure.error
                );
                Err(Error::RetriesExhausted {
                    operation: "resolve_channel".to_string(),
                    attempts: failure.attempts,
                    last: Box::new(failure.error),
                })
            }
        }
    }
}
