//! Playback engine
//!
//! Process-wide owner of the audio player and the current-resource slot.
//! The player is built lazily on first use and then reused for every
//! reconnect; building it starts the event loop that keeps playback alive.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;
use vcl_common::{BotEvent, EventBus};

use super::player::AudioPlayer;
use super::resource::{AudioResource, ResourceSlot};

pub struct PlaybackEngine {
    resources: Arc<ResourceSlot>,
    player: OnceCell<AudioPlayer>,
    events: Arc<EventBus>,
}

impl PlaybackEngine {
    pub fn new(asset_path: PathBuf, events: Arc<EventBus>) -> Self {
        Self {
            resources: Arc::new(ResourceSlot::new(asset_path, Arc::clone(&events))),
            player: OnceCell::new(),
            events,
        }
    }

    /// Current resource; a new one if none exists or the current one ended
    pub fn audio_resource(&self) -> Arc<AudioResource> {
        self.resources.current()
    }

    /// The player singleton.
    ///
    /// The first call creates it, spawns its event loop and starts the
    /// current resource. Later calls return the same player untouched.
    pub async fn audio_player(&self) -> AudioPlayer {
        self.player
            .get_or_init(|| async {
                let (player, events_rx) =
                    AudioPlayer::new(Arc::clone(&self.resources), Arc::clone(&self.events));
                player.spawn_event_loop(events_rx);

                info!("Audio player created");
                self.events.emit_lossy(BotEvent::PlayerCreated {
                    timestamp: chrono::Utc::now(),
                });

                player.play(self.resources.current()).await;
                player
            })
            .await
            .clone()
    }

    /// The player, if it has been created
    pub fn existing_player(&self) -> Option<&AudioPlayer> {
        self.player.get()
    }

    pub fn resources(&self) -> &Arc<ResourceSlot> {
        &self.resources
    }
}
