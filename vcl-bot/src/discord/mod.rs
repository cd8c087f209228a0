//! Discord adapters
//!
//! serenity provides the gateway client, REST channel lookup, and connect
//! signals; songbird provides voice sessions and track playback.

pub mod channels;
pub mod handler;
pub mod voice;

pub use channels::SerenityChannels;
pub use handler::Handler;
pub use voice::{SongbirdGateway, SongbirdSession, SongbirdSink};

use serenity::all::{Client, GatewayIntents, Http};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tokio::signal;
use tracing::{debug, info, warn};
use vcl_common::EventBus;

use crate::config::BotConfig;
use crate::error::Result;
use crate::retry::TokioSleeper;
use crate::session::SessionManager;

/// Guild metadata and voice state updates; nothing else is needed
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES
}

/// Log in and run until the gateway client stops or a shutdown signal arrives
pub async fn run(config: BotConfig) -> Result<()> {
    let http = Arc::new(Http::new(&config.token));
    let user = http.get_current_user().await?;
    info!("Logged in as {} ({})", user.id, user.name);

    let events = Arc::new(EventBus::default());
    spawn_event_log(&events);

    let manager = Songbird::serenity();
    let sessions = Arc::new(SessionManager::from_config(
        &config,
        Arc::new(SerenityChannels::new(Arc::clone(&http))),
        Arc::new(SongbirdGateway::new(Arc::clone(&manager))),
        Arc::new(TokioSleeper),
        events,
    ));

    let mut client = Client::builder(&config.token, intents())
        .event_handler(Handler::new(sessions))
        .register_songbird_with(manager)
        .await?;

    let shard_manager = Arc::clone(&client.shard_manager);
    tokio::spawn(async move {
        shutdown_signal().await;
        shard_manager.shutdown_all().await;
    });

    client.start().await?;
    info!("Gateway client stopped");
    Ok(())
}

/// Mirror bot events into the debug log
fn spawn_event_log(events: &EventBus) {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        use tokio::sync::broadcast::error::RecvError;
        loop {
            match rx.recv().await {
                Ok(event) => debug!(event = event.event_type(), "{:?}", event),
                Err(RecvError::Lagged(n)) => warn!("Event log lagged, skipped {} events", n),
                Err(RecvError::Closed) => break,
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
