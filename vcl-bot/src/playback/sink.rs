//! Audio sinks and the events they report back to the player
//!
//! A sink is the per-subscription endpoint inside a voice session. The
//! player tells it what to stream; the sink reports progress through a
//! [`SinkNotifier`], tagged with its subscription and the resource
//! generation so that late reports from a replaced sink or an old resource
//! can be discarded.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::trace;

use super::resource::AudioResource;
use crate::error::Result;
use crate::subscription::SubscriptionId;

/// Per-subscription audio endpoint
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Begin streaming `resource` at `offset` into the asset, replacing
    /// anything this sink was streaming. Completion and failures are reported
    /// via `notifier`.
    async fn start(
        &self,
        resource: Arc<AudioResource>,
        offset: Duration,
        notifier: SinkNotifier,
    ) -> Result<()>;

    /// How far into its resource this sink has streamed; `None` when it is
    /// not streaming anything
    async fn position(&self) -> Option<Duration>;

    /// Stop streaming for good. Any end notification this triggers is
    /// discarded by the player because the sink is detached first.
    async fn stop(&self) -> Result<()>;
}

/// Sink report consumed by the player event loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    Started {
        subscription: SubscriptionId,
        generation: u64,
    },
    Ended {
        subscription: SubscriptionId,
        generation: u64,
    },
    Failed {
        subscription: SubscriptionId,
        generation: u64,
        message: String,
    },
}

impl PlayerEvent {
    pub fn subscription(&self) -> SubscriptionId {
        match self {
            PlayerEvent::Started { subscription, .. }
            | PlayerEvent::Ended { subscription, .. }
            | PlayerEvent::Failed { subscription, .. } => *subscription,
        }
    }

    pub fn generation(&self) -> u64 {
        match self {
            PlayerEvent::Started { generation, .. }
            | PlayerEvent::Ended { generation, .. }
            | PlayerEvent::Failed { generation, .. } => *generation,
        }
    }
}

/// Handle a sink uses to report on one started resource
#[derive(Debug, Clone)]
pub struct SinkNotifier {
    subscription: SubscriptionId,
    generation: u64,
    tx: mpsc::UnboundedSender<PlayerEvent>,
}

impl SinkNotifier {
    pub(crate) fn new(
        subscription: SubscriptionId,
        generation: u64,
        tx: mpsc::UnboundedSender<PlayerEvent>,
    ) -> Self {
        Self {
            subscription,
            generation,
            tx,
        }
    }

    pub fn subscription(&self) -> SubscriptionId {
        self.subscription
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn started(&self) {
        self.send(PlayerEvent::Started {
            subscription: self.subscription,
            generation: self.generation,
        });
    }

    pub fn ended(&self) {
        self.send(PlayerEvent::Ended {
            subscription: self.subscription,
            generation: self.generation,
        });
    }

    pub fn failed(&self, message: impl Into<String>) {
        self.send(PlayerEvent::Failed {
            subscription: self.subscription,
            generation: self.generation,
            message: message.into(),
        });
    }

    fn send(&self, event: PlayerEvent) {
        // Receiver gone means the player event loop has shut down
        if self.tx.send(event).is_err() {
            trace!("Player event loop closed, dropping sink report");
        }
    }
}
