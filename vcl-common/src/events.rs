//! Event types for the VCL event system
//!
//! Every operational milestone the agent logs is also published on the
//! EventBus, so tests and other in-process observers can follow the connect
//! sequence and the playback loop without scraping logs.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Audio player status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "PascalCase")]
pub enum PlayerStatus {
    /// No resource is being played
    Idle,
    /// A resource was handed to the attached sinks, not yet confirmed streaming
    Buffering,
    /// Streaming to at least one sink
    Playing,
    /// Paused on request
    Paused,
    /// Paused because no subscriber is attached
    AutoPaused,
}

impl std::fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerStatus::Idle => write!(f, "Idle"),
            PlayerStatus::Buffering => write!(f, "Buffering"),
            PlayerStatus::Playing => write!(f, "Playing"),
            PlayerStatus::Paused => write!(f, "Paused"),
            PlayerStatus::AutoPaused => write!(f, "AutoPaused"),
        }
    }
}

/// VCL event types
///
/// Serialized with a `type` tag so the stream can be dumped as JSON lines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum BotEvent {
    /// Platform connect signal received
    Connected {
        /// False for the first connect of the process, true afterwards
        reconnect: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An operation failed and will be retried after `delay_ms`
    RetryScheduled {
        /// Name of the retried operation
        operation: String,
        /// Attempt number that failed (1-based)
        attempt: u32,
        delay_ms: u64,
        error: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Configured channel resolved to a voice channel
    ChannelResolved {
        channel_id: u64,
        guild_id: u64,
        name: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The audio player singleton was constructed
    PlayerCreated {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A voice session is attached to the target channel
    VoiceSessionReady {
        guild_id: u64,
        channel_id: u64,
        /// True when an existing session was reused
        reused: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The previous player subscription was released
    SubscriptionReleased {
        subscription_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A new player subscription was created
    SubscriptionCreated {
        subscription_id: Uuid,
        guild_id: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A new audio resource became current
    ResourceCreated {
        /// Monotonic resource generation (1 for the first resource)
        generation: u64,
        /// True when it replaced an ended resource
        replaced_ended: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Player status changed
    PlayerStateChanged {
        old_state: PlayerStatus,
        new_state: PlayerStatus,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Player reported a (non-fatal) error
    PlayerError {
        generation: u64,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl BotEvent {
    /// Event name as used in the serialized `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            BotEvent::Connected { .. } => "Connected",
            BotEvent::RetryScheduled { .. } => "RetryScheduled",
            BotEvent::ChannelResolved { .. } => "ChannelResolved",
            BotEvent::PlayerCreated { .. } => "PlayerCreated",
            BotEvent::VoiceSessionReady { .. } => "VoiceSessionReady",
            BotEvent::SubscriptionReleased { .. } => "SubscriptionReleased",
            BotEvent::SubscriptionCreated { .. } => "SubscriptionCreated",
            BotEvent::ResourceCreated { .. } => "ResourceCreated",
            BotEvent::PlayerStateChanged { .. } => "PlayerStateChanged",
            BotEvent::PlayerError { .. } => "PlayerError",
        }
    }
}

/// Central event distribution bus
///
/// Thin wrapper over a tokio broadcast channel. Slow receivers lose the
/// oldest events once `capacity` is exceeded.
pub struct EventBus {
    tx: broadcast::Sender<BotEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use vcl_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(256);
    /// assert_eq!(event_bus.capacity(), 256);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<BotEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: BotEvent) -> Result<usize, broadcast::error::SendError<BotEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// ```
    /// use vcl_common::events::{BotEvent, EventBus};
    ///
    /// let event_bus = EventBus::new(16);
    /// event_bus.emit_lossy(BotEvent::PlayerCreated { timestamp: chrono::Utc::now() });
    /// ```
    pub fn emit_lossy(&self, event: BotEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
