//! Session state owned by the Session Manager
//!
//! Everything that must survive between connect signals but belongs to the
//! connection side (as opposed to the playback side) lives here.

use std::sync::Arc;

use crate::channel::GuildId;
use crate::subscription::{Subscription, SubscriptionId};
use crate::voice::VoiceSession;

/// First-connect vs reconnect tracking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionState {
    pub connected: bool,
}

impl SessionState {
    /// Record a connect signal. Returns true if this is a reconnect.
    pub fn mark_connected(&mut self) -> bool {
        std::mem::replace(&mut self.connected, true)
    }
}

/// Mutable context threaded through one connect sequence
#[derive(Default)]
pub struct SessionContext {
    pub state: SessionState,
    /// The one live subscription, if any
    pub subscription: Option<Subscription>,
    /// Session the subscription is bound to
    pub session: Option<Arc<dyn VoiceSession>>,
    /// Completed connect sequences
    pub completed_sequences: u64,
}

/// Read-only view of the context for status reporting and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub connected: bool,
    pub subscription_id: Option<SubscriptionId>,
    pub subscription_live: bool,
    pub guild_id: Option<GuildId>,
    pub completed_sequences: u64,
}

impl SessionContext {
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            connected: self.state.connected,
            subscription_id: self.subscription.as_ref().map(Subscription::id),
            subscription_live: self
                .subscription
                .as_ref()
                .is_some_and(Subscription::is_live),
            guild_id: self.session.as_ref().map(|s| s.guild_id()),
            completed_sequences: self.completed_sequences,
        }
    }
}
