//! Playback engine, player state machine, and audio resources

pub mod engine;
pub mod player;
pub mod resource;
pub mod sink;
pub mod state;

pub use engine::PlaybackEngine;
pub use player::{AudioPlayer, PlayerEventReceiver};
pub use resource::{AudioResource, ResourceSlot, StreamType};
pub use sink::{AudioSink, PlayerEvent, SinkNotifier};
pub use state::{transition, PlayerAction, PlayerInput, PlayerStatus, Transition};
