//! Audio player
//!
//! Owns the current resource and the attached sinks, and drives them from
//! the transition table in [`super::state`]. Sink reports arrive on an
//! unbounded channel and are applied by the event loop task; an edge into
//! `Idle` makes the loop fetch the current resource from the
//! [`ResourceSlot`] (recreating it if it ended) and play it again.
//!
//! While auto-paused the player remembers how far the last sink got, so a
//! sink attached after a reconnect picks the resource up where it left off.

use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};
use vcl_common::{BotEvent, EventBus};

use super::resource::{AudioResource, ResourceSlot};
use super::sink::{AudioSink, PlayerEvent, SinkNotifier};
use super::state::{transition, PlayerAction, PlayerInput, PlayerStatus};
use crate::channel::GuildId;
use crate::subscription::{Subscription, SubscriptionId};

/// Receiving end of the sink report channel
pub type PlayerEventReceiver = mpsc::UnboundedReceiver<PlayerEvent>;

struct AttachedSink {
    id: SubscriptionId,
    sink: Arc<dyn AudioSink>,
    /// Whether the current resource was started on this sink
    started: bool,
}

struct PlayerCore {
    status: PlayerStatus,
    resource: Option<Arc<AudioResource>>,
    /// Position in `resource` recorded when its last sink was detached
    position: Duration,
    sinks: Vec<AttachedSink>,
}

struct PlayerInner {
    core: Mutex<PlayerCore>,
    resources: Arc<ResourceSlot>,
    events_tx: mpsc::UnboundedSender<PlayerEvent>,
    bus: Arc<EventBus>,
}

/// Shared handle to the audio player
///
/// With no subscriber attached the player auto-pauses, holding on to its
/// resource until a sink shows up again.
#[derive(Clone)]
pub struct AudioPlayer {
    inner: Arc<PlayerInner>,
}

impl std::fmt::Debug for AudioPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioPlayer").finish_non_exhaustive()
    }
}

impl AudioPlayer {
    /// Create a player and the receiver its sinks report into.
    ///
    /// Nothing processes the receiver until it is handed to
    /// [`AudioPlayer::spawn_event_loop`] (or drained by hand in tests).
    pub fn new(resources: Arc<ResourceSlot>, bus: Arc<EventBus>) -> (Self, PlayerEventReceiver) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let player = Self {
            inner: Arc::new(PlayerInner {
                core: Mutex::new(PlayerCore {
                    status: PlayerStatus::Idle,
                    resource: None,
                    position: Duration::ZERO,
                    sinks: Vec::new(),
                }),
                resources,
                events_tx,
                bus,
            }),
        };
        (player, events_rx)
    }

    /// Spawn the task applying sink reports. It exits once the player is dropped.
    pub fn spawn_event_loop(&self, mut events_rx: PlayerEventReceiver) {
        let weak: Weak<PlayerInner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                let Some(inner) = weak.upgrade() else { break };
                AudioPlayer { inner }.handle_event(event).await;
            }
            debug!("Player event loop stopped");
        });
    }

    /// True when both handles refer to the same player
    pub fn ptr_eq(&self, other: &AudioPlayer) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub async fn status(&self) -> PlayerStatus {
        self.inner.core.lock().await.status
    }

    pub async fn subscriber_count(&self) -> usize {
        self.inner.core.lock().await.sinks.len()
    }

    pub async fn current_resource(&self) -> Option<Arc<AudioResource>> {
        self.inner.core.lock().await.resource.clone()
    }

    /// Make `resource` current and start it on every attached sink
    pub async fn play(&self, resource: Arc<AudioResource>) {
        let mut core = self.inner.core.lock().await;
        debug!(generation = resource.generation(), "Play requested");
        core.resource = Some(resource);
        core.position = Duration::ZERO;
        let subscribed = !core.sinks.is_empty();
        self.apply(&mut core, PlayerInput::Play { subscribed }, None)
            .await;
    }

    /// Attach `sink` and return the subscription that owns the attachment
    pub async fn subscribe(&self, sink: Arc<dyn AudioSink>, guild_id: GuildId) -> Subscription {
        let id = SubscriptionId::new();
        let mut core = self.inner.core.lock().await;
        core.sinks.push(AttachedSink {
            id,
            sink,
            started: false,
        });
        debug!(subscription = %id, "Subscriber attached");
        self.apply(&mut core, PlayerInput::SubscriberAttached, Some(id))
            .await;
        drop(core);

        Subscription::new(id, guild_id, self.clone())
    }

    /// Detach and stop the sink of subscription `id`, keeping its position.
    ///
    /// Returns false if it was not attached.
    pub(crate) async fn detach(&self, id: SubscriptionId) -> bool {
        let mut core = self.inner.core.lock().await;
        let Some(pos) = core.sinks.iter().position(|s| s.id == id) else {
            return false;
        };
        let detached = core.sinks.remove(pos);
        debug!(subscription = %id, "Subscriber detached");

        if detached.started {
            if let Some(position) = detached.sink.position().await {
                debug!(subscription = %id, ?position, "Holding playback position");
                core.position = position;
            }
        }

        if let Err(e) = detached.sink.stop().await {
            warn!(subscription = %id, "Failed to stop detached sink: {}", e);
        }

        if core.sinks.is_empty() {
            self.apply(&mut core, PlayerInput::SubscribersGone, None)
                .await;
        }
        true
    }

    /// Apply one sink report
    ///
    /// Reports from detached sinks or about a resource that is no longer
    /// current are ignored.
    pub async fn handle_event(&self, event: PlayerEvent) {
        let request_play = {
            let mut core = self.inner.core.lock().await;

            if !core.sinks.iter().any(|s| s.id == event.subscription()) {
                debug!(?event, "Ignoring report from detached sink");
                return;
            }
            let Some(resource) = core.resource.clone() else {
                return;
            };
            if resource.generation() != event.generation() {
                debug!(?event, "Ignoring report about a replaced resource");
                return;
            }

            let input = match event {
                PlayerEvent::Started { .. } => PlayerInput::SinkStarted,
                PlayerEvent::Ended { .. } => {
                    resource.mark_ended();
                    PlayerInput::ResourceEnded
                }
                PlayerEvent::Failed { message, .. } => {
                    error!(
                        generation = resource.generation(),
                        "Audio player error: {}", message
                    );
                    self.inner.bus.emit_lossy(BotEvent::PlayerError {
                        generation: resource.generation(),
                        message,
                        timestamp: chrono::Utc::now(),
                    });
                    resource.mark_ended();
                    PlayerInput::Failed
                }
            };

            self.apply(&mut core, input, None).await
        };

        if request_play {
            let next = self.inner.resources.current();
            self.play(next).await;
        }
    }

    /// Run one transition and its side effect. Returns true when the caller
    /// must request playback (after releasing the lock).
    async fn apply(
        &self,
        core: &mut PlayerCore,
        input: PlayerInput,
        attached: Option<SubscriptionId>,
    ) -> bool {
        let from = core.status;
        let t = transition(from, input);

        if t.next != from {
            debug!("Player state {} -> {} ({:?})", from, t.next, input);
            core.status = t.next;
            self.inner.bus.emit_lossy(BotEvent::PlayerStateChanged {
                old_state: from,
                new_state: t.next,
                timestamp: chrono::Utc::now(),
            });
        }

        let resource = core.resource.clone();
        match t.action {
            PlayerAction::None => {}
            PlayerAction::StartSinks => {
                if let Some(resource) = resource {
                    for sink in core.sinks.iter_mut() {
                        self.start_sink(sink, &resource, Duration::ZERO).await;
                    }
                }
            }
            PlayerAction::StartAttached => {
                if let (Some(resource), Some(id)) = (resource, attached) {
                    let offset = Self::held_position(core).await;
                    if let Some(sink) = core.sinks.iter_mut().find(|s| s.id == id) {
                        self.start_sink(sink, &resource, offset).await;
                    }
                }
            }
            PlayerAction::RequestPlay => {
                info!("Player idle, restarting playback");
                return true;
            }
        }
        false
    }

    /// Where a newly attached sink should start: alongside a sink that is
    /// already streaming, else where the last detached sink stopped
    async fn held_position(core: &PlayerCore) -> Duration {
        for sink in core.sinks.iter().filter(|s| s.started) {
            if let Some(position) = sink.sink.position().await {
                return position;
            }
        }
        core.position
    }

    async fn start_sink(
        &self,
        sink: &mut AttachedSink,
        resource: &Arc<AudioResource>,
        offset: Duration,
    ) {
        let notifier = SinkNotifier::new(
            sink.id,
            resource.generation(),
            self.inner.events_tx.clone(),
        );
        if !offset.is_zero() {
            debug!(subscription = %sink.id, ?offset, "Resuming resource mid-stream");
        }
        match sink
            .sink
            .start(Arc::clone(resource), offset, notifier.clone())
            .await
        {
            Ok(()) => sink.started = true,
            Err(e) => {
                sink.started = false;
                // Routed through the event loop like any asynchronous failure
                notifier.failed(e.to_string());
            }
        }
    }
}
