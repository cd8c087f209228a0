//! Player subscriptions
//!
//! A [`Subscription`] is the single audio path from the player into a voice
//! session. [`rebind`] replaces the held subscription: release first, then
//! create, so two paths never coexist.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;
use uuid::Uuid;
use vcl_common::{BotEvent, EventBus};

use crate::channel::GuildId;
use crate::playback::AudioPlayer;
use crate::voice::VoiceSession;

/// Unique id of one player-to-session attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Binding of the player to one voice session
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    guild_id: GuildId,
    player: AudioPlayer,
    live: AtomicBool,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, guild_id: GuildId, player: AudioPlayer) -> Self {
        Self {
            id,
            guild_id,
            player,
            live: AtomicBool::new(true),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Detach from the player and stop the session's stream.
    ///
    /// Idempotent; returns true only for the call that actually released it.
    pub async fn unsubscribe(&self) -> bool {
        if !self.live.swap(false, Ordering::AcqRel) {
            return false;
        }
        self.player.detach(self.id).await
    }
}

/// Release the held subscription (if any), then subscribe `session` to `player`.
///
/// Returns the id of the new subscription, now stored in `current`.
pub async fn rebind(
    current: &mut Option<Subscription>,
    session: &dyn VoiceSession,
    player: &AudioPlayer,
    events: &EventBus,
) -> SubscriptionId {
    info!("Releasing previous subscription...");
    if let Some(previous) = current.take() {
        previous.unsubscribe().await;
        events.emit_lossy(BotEvent::SubscriptionReleased {
            subscription_id: previous.id().as_uuid(),
            timestamp: chrono::Utc::now(),
        });
    }

    info!("Playing audio!");
    let subscription = player
        .subscribe(session.open_sink(), session.guild_id())
        .await;
    let id = subscription.id();
    info!(subscription = %id, guild_id = %subscription.guild_id(), "Subscribed player to voice session");

    events.emit_lossy(BotEvent::SubscriptionCreated {
        subscription_id: id.as_uuid(),
        guild_id: subscription.guild_id().get(),
        timestamp: chrono::Utc::now(),
    });
    *current = Some(subscription);
    id
}
