//! Voice sessions and audio sinks backed by songbird

use async_trait::async_trait;
use songbird::error::ControlError;
use songbird::events::{Event, EventContext, EventHandler as VoiceEventHandler, TrackEvent};
use songbird::input::{File, Input};
use songbird::tracks::{PlayMode, TrackHandle};
use songbird::{Call, Songbird};
use std::fmt::Display;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::channel::GuildId;
use crate::error::{Error, Result};
use crate::playback::{AudioResource, AudioSink, SinkNotifier};
use crate::voice::{JoinOptions, VoiceGateway, VoiceSession};

fn serenity_guild(id: GuildId) -> serenity::all::GuildId {
    serenity::all::GuildId::new(id.get())
}

/// Session registry kept by the songbird manager
pub struct SongbirdGateway {
    manager: Arc<Songbird>,
}

impl SongbirdGateway {
    pub fn new(manager: Arc<Songbird>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl VoiceGateway for SongbirdGateway {
    fn session(&self, guild_id: GuildId) -> Option<Arc<dyn VoiceSession>> {
        self.manager.get(serenity_guild(guild_id)).map(|call| {
            Arc::new(SongbirdSession::new(guild_id, call)) as Arc<dyn VoiceSession>
        })
    }

    async fn create_session(&self, options: &JoinOptions) -> Arc<dyn VoiceSession> {
        let call = self.manager.get_or_insert(serenity_guild(options.guild_id));
        Arc::new(SongbirdSession::new(options.guild_id, call))
    }
}

/// One guild's songbird call
pub struct SongbirdSession {
    guild_id: GuildId,
    call: Arc<Mutex<Call>>,
}

impl SongbirdSession {
    pub fn new(guild_id: GuildId, call: Arc<Mutex<Call>>) -> Self {
        Self { guild_id, call }
    }
}

#[async_trait]
impl VoiceSession for SongbirdSession {
    fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    async fn rejoin(&self, options: &JoinOptions) -> Result<()> {
        let join = {
            let mut call = self.call.lock().await;
            call.mute(options.self_mute)
                .await
                .map_err(|e| Error::Voice(format!("mute: {}", e)))?;
            call.deafen(options.self_deaf)
                .await
                .map_err(|e| Error::Voice(format!("deafen: {}", e)))?;
            call.join(serenity::all::ChannelId::new(options.channel_id.get()))
                .await
                .map_err(|e| Error::Voice(format!("join: {}", e)))?
        };

        // The handshake completes through gateway events; report it off the
        // connect path.
        let guild_id = options.guild_id;
        let channel_id = options.channel_id;
        tokio::spawn(async move {
            match join.await {
                Ok(()) => info!(%guild_id, %channel_id, "Voice connection established"),
                Err(e) => warn!(%guild_id, %channel_id, "Voice connection failed: {}", e),
            }
        });
        Ok(())
    }

    fn open_sink(&self) -> Arc<dyn AudioSink> {
        Arc::new(SongbirdSink::new(Arc::clone(&self.call)))
    }
}

/// A track slot on a songbird call
pub struct SongbirdSink {
    call: Arc<Mutex<Call>>,
    track: StdMutex<Option<TrackHandle>>,
}

impl SongbirdSink {
    pub fn new(call: Arc<Mutex<Call>>) -> Self {
        Self {
            call,
            track: StdMutex::new(None),
        }
    }

    fn current_track(&self) -> Option<TrackHandle> {
        self.track
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace_track(&self, handle: Option<TrackHandle>) -> Option<TrackHandle> {
        std::mem::replace(
            &mut *self.track.lock().unwrap_or_else(PoisonError::into_inner),
            handle,
        )
    }
}

/// Wire end and error reports for `handle` into `notifier`
fn register_reporters(
    handle: &TrackHandle,
    notifier: &SinkNotifier,
) -> std::result::Result<(), ControlError> {
    for (event, kind) in [
        (TrackEvent::End, ReportKind::Ended),
        (TrackEvent::Error, ReportKind::Failed),
    ] {
        handle.add_event(
            Event::Track(event),
            TrackReporter {
                notifier: notifier.clone(),
                kind,
            },
        )?;
    }
    Ok(())
}

/// Keep a freshly started `track` only if its reports could be wired up.
///
/// A track nobody hears back from is stopped rather than left playing.
fn keep_if_tracked<T, E: Display>(
    track: T,
    register: impl FnOnce(&T) -> std::result::Result<(), E>,
    stop: impl FnOnce(&T),
) -> Result<T> {
    match register(&track) {
        Ok(()) => Ok(track),
        Err(e) => {
            stop(&track);
            Err(Error::Player(format!("track events: {}", e)))
        }
    }
}

#[async_trait]
impl AudioSink for SongbirdSink {
    async fn start(
        &self,
        resource: Arc<AudioResource>,
        offset: Duration,
        notifier: SinkNotifier,
    ) -> Result<()> {
        if let Some(previous) = self.replace_track(None) {
            let _ = previous.stop();
        }

        let input: Input = File::new(resource.path().to_path_buf()).into();
        let handle = self.call.lock().await.play_input(input);
        let handle = keep_if_tracked(
            handle,
            |h| register_reporters(h, &notifier),
            |h| {
                if let Err(e) = h.stop() {
                    debug!("Untracked track already stopped: {}", e);
                }
            },
        )?;

        if !offset.is_zero() {
            // A failed seek leaves the track playing from the start
            let _ = handle.seek(offset);
        }

        self.replace_track(Some(handle));
        notifier.started();
        Ok(())
    }

    async fn position(&self) -> Option<Duration> {
        let track = self.current_track()?;
        match track.get_info().await {
            Ok(state) => Some(state.position),
            Err(e) => {
                debug!("No position for track: {}", e);
                None
            }
        }
    }

    async fn stop(&self) -> Result<()> {
        if let Some(track) = self.replace_track(None) {
            // Already-finished tracks reject control messages
            if let Err(e) = track.stop() {
                debug!("Track already stopped: {}", e);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum ReportKind {
    Ended,
    Failed,
}

/// Forwards songbird track events to the player
struct TrackReporter {
    notifier: SinkNotifier,
    kind: ReportKind,
}

#[async_trait]
impl VoiceEventHandler for TrackReporter {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        match self.kind {
            ReportKind::Ended => self.notifier.ended(),
            ReportKind::Failed => {
                let message = match ctx {
                    EventContext::Track(tracks) => tracks
                        .iter()
                        .find_map(|(state, _)| match &state.playing {
                            PlayMode::Errored(e) => Some(format!("{:?}", e)),
                            _ => None,
                        })
                        .unwrap_or_else(|| "track error".to_string()),
                    _ => "track error".to_string(),
                };
                self.notifier.failed(message);
            }
        }
        None
    }
}
