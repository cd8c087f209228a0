//! Session Manager
//!
//! Runs the full connect sequence on every gateway connect or reconnect:
//! resolve channel, get player, connect voice, rebind subscription.
//! Connection state is re-established from scratch each time; playback
//! state (player, resource) is reused.
//!
//! Signals that overlap are serialized on the context lock, so each one
//! performs exactly one release-then-subscribe and the last signal to
//! finish owns the live subscription.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use vcl_common::{BotEvent, EventBus};

use crate::channel::{ChannelDirectory, ChannelResolver};
use crate::config::BotConfig;
use crate::error::Result;
use crate::playback::PlaybackEngine;
use crate::retry::Sleeper;
use crate::state::{SessionContext, SessionSnapshot};
use crate::subscription::{rebind, SubscriptionId};
use crate::voice::{VoiceConnector, VoiceGateway};

pub struct SessionManager {
    resolver: ChannelResolver,
    connector: VoiceConnector,
    playback: PlaybackEngine,
    context: Mutex<SessionContext>,
    events: Arc<EventBus>,
}

impl SessionManager {
    pub fn new(
        resolver: ChannelResolver,
        connector: VoiceConnector,
        playback: PlaybackEngine,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            resolver,
            connector,
            playback,
            context: Mutex::new(SessionContext::default()),
            events,
        }
    }

    /// Wire the components from configuration and platform adapters
    pub fn from_config(
        config: &BotConfig,
        directory: Arc<dyn ChannelDirectory>,
        gateway: Arc<dyn VoiceGateway>,
        sleeper: Arc<dyn Sleeper>,
        events: Arc<EventBus>,
    ) -> Self {
        let resolver = ChannelResolver::new(
            directory,
            config.channel_id.clone(),
            config.retry_policy(),
            sleeper,
            Arc::clone(&events),
        );
        let connector = VoiceConnector::new(gateway, Arc::clone(&events));
        let playback = PlaybackEngine::new(config.asset_path.clone(), Arc::clone(&events));
        Self::new(resolver, connector, playback, events)
    }

    pub fn playback(&self) -> &PlaybackEngine {
        &self.playback
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.context.lock().await.snapshot()
    }

    /// Handle one connect/reconnect signal
    pub async fn on_connect(&self) -> Result<SubscriptionId> {
        let mut context = self.context.lock().await;

        let reconnect = context.state.mark_connected();
        if reconnect {
            warn!("Reconnected to Discord");
        } else {
            info!("Connected to Discord");
        }
        self.events.emit_lossy(BotEvent::Connected {
            reconnect,
            timestamp: chrono::Utc::now(),
        });

        info!("Getting voice channel...");
        let channel = self.resolver.resolve().await?;

        info!("Getting audio player...");
        let player = self.playback.audio_player().await;

        info!("Connecting to the voice channel...");
        let session = self.connector.connect(&channel).await;

        let context = &mut *context;
        let id = rebind(
            &mut context.subscription,
            session.as_ref(),
            &player,
            &self.events,
        )
        .await;
        context.session = Some(session);
        context.completed_sequences += 1;

        Ok(id)
    }

    /// [`SessionManager::on_connect`] for fire-and-forget callers: failures
    /// are logged and left for the next signal.
    pub async fn handle_connect_signal(&self) {
        if let Err(e) = self.on_connect().await {
            error!("Connect sequence aborted: {}", e);
        }
    }
}
