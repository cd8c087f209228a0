//! Audio resources and the current-resource slot

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;
use vcl_common::{BotEvent, EventBus};

/// How the asset bytes are fed to the voice transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamType {
    /// Ogg container carrying Opus packets, passed through without re-encoding
    OggOpus,
}

/// A playable handle onto the looped asset
///
/// Resources are single-use: once `ended` is set the slot hands out a fresh
/// one on the next request.
#[derive(Debug)]
pub struct AudioResource {
    generation: u64,
    path: PathBuf,
    stream_type: StreamType,
    inline_volume: bool,
    ended: AtomicBool,
}

impl AudioResource {
    fn new(generation: u64, path: PathBuf) -> Self {
        Self {
            generation,
            path,
            stream_type: StreamType::OggOpus,
            inline_volume: false,
            ended: AtomicBool::new(false),
        }
    }

    /// Monotonic id; 1 for the first resource of the process
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stream_type(&self) -> StreamType {
        self.stream_type
    }

    /// Always false: volume changes would force a decode/re-encode cycle
    pub fn inline_volume(&self) -> bool {
        self.inline_volume
    }

    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::Acquire)
    }

    pub fn mark_ended(&self) {
        self.ended.store(true, Ordering::Release);
    }
}

/// Holds the current resource, recreating it once it has ended
pub struct ResourceSlot {
    asset_path: PathBuf,
    current: Mutex<Option<Arc<AudioResource>>>,
    next_generation: AtomicU64,
    events: Arc<EventBus>,
}

impl ResourceSlot {
    pub fn new(asset_path: PathBuf, events: Arc<EventBus>) -> Self {
        Self {
            asset_path,
            current: Mutex::new(None),
            next_generation: AtomicU64::new(1),
            events,
        }
    }

    /// The current resource, created first if none exists or it has ended
    pub fn current(&self) -> Arc<AudioResource> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(resource) = current.as_ref() {
            if !resource.is_ended() {
                return Arc::clone(resource);
            }
        }

        let replaced_ended = current.is_some();
        if replaced_ended {
            info!("Audio resource ended, creating new audio resource...");
        } else {
            info!("Creating new audio resource...");
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let resource = Arc::new(AudioResource::new(generation, self.asset_path.clone()));
        *current = Some(Arc::clone(&resource));

        self.events.emit_lossy(BotEvent::ResourceCreated {
            generation,
            replaced_ended,
            timestamp: chrono::Utc::now(),
        });

        resource
    }

    /// The current resource without creating one
    pub fn peek(&self) -> Option<Arc<AudioResource>> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
