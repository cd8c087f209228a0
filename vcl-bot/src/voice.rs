//! Voice connection
//!
//! Gets a voice session for the channel's guild (reusing one the voice
//! library already holds) and always forces a rejoin of the target channel,
//! so a stale session left over from before a reconnect is pulled back in.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};
use vcl_common::{BotEvent, EventBus};

use crate::channel::{ChannelId, GuildId, VoiceChannel};
use crate::error::Result;
use crate::playback::AudioSink;

/// Join parameters for a voice session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinOptions {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub self_mute: bool,
    pub self_deaf: bool,
}

impl JoinOptions {
    /// Unmuted (we stream audio) and deafened (we never listen)
    pub fn for_channel(channel: &VoiceChannel) -> Self {
        Self {
            guild_id: channel.guild_id,
            channel_id: channel.id,
            self_mute: false,
            self_deaf: true,
        }
    }
}

/// A voice session for one guild, owned by the voice library
#[async_trait]
pub trait VoiceSession: Send + Sync {
    fn guild_id(&self) -> GuildId;

    /// (Re)join `options.channel_id` with the given mute/deafen flags.
    ///
    /// Completion of the underlying connection is reported by the transport
    /// asynchronously; an `Err` here only covers failures to issue the request.
    async fn rejoin(&self, options: &JoinOptions) -> Result<()>;

    /// Open a new audio endpoint on this session for a player subscription
    fn open_sink(&self) -> Arc<dyn AudioSink>;
}

/// Registry of voice sessions keyed by guild
#[async_trait]
pub trait VoiceGateway: Send + Sync {
    /// Existing session for `guild_id`, if the voice library holds one
    fn session(&self, guild_id: GuildId) -> Option<Arc<dyn VoiceSession>>;

    /// Create a session bound to `options.guild_id` through the guild's
    /// signalling adapter
    async fn create_session(&self, options: &JoinOptions) -> Arc<dyn VoiceSession>;
}

/// Obtains a live voice session for a channel
pub struct VoiceConnector {
    gateway: Arc<dyn VoiceGateway>,
    events: Arc<EventBus>,
}

impl VoiceConnector {
    pub fn new(gateway: Arc<dyn VoiceGateway>, events: Arc<EventBus>) -> Self {
        Self { gateway, events }
    }

    /// Reuse or create the guild's session, then force a rejoin of `channel`.
    ///
    /// Never fails: rejoin errors are logged and left to the next connect
    /// signal to correct.
    pub async fn connect(&self, channel: &VoiceChannel) -> Arc<dyn VoiceSession> {
        let options = JoinOptions::for_channel(channel);

        let (session, reused) = match self.gateway.session(channel.guild_id) {
            Some(session) => {
                info!(guild_id = %channel.guild_id, "Connection restored...");
                (session, true)
            }
            None => {
                info!(guild_id = %channel.guild_id, "Connecting to the RTC...");
                (self.gateway.create_session(&options).await, false)
            }
        };

        if let Err(e) = session.rejoin(&options).await {
            warn!(
                guild_id = %channel.guild_id,
                channel_id = %channel.id,
                "Rejoin request failed: {}", e
            );
        }

        self.events.emit_lossy(BotEvent::VoiceSessionReady {
            guild_id: channel.guild_id.get(),
            channel_id: channel.id.get(),
            reused,
            timestamp: chrono::Utc::now(),
        });

        session
    }
}
