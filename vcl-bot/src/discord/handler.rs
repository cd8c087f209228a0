//! Gateway event handler
//!
//! `ready` and `resume` are both connect signals: either one runs the full
//! connect sequence again.

use async_trait::async_trait;
use serenity::all::{Context, EventHandler, Ready, ResumedEvent};
use std::sync::Arc;
use tracing::info;

use crate::session::SessionManager;

pub struct Handler {
    sessions: Arc<SessionManager>,
}

impl Handler {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }

    fn signal(&self) {
        let sessions = Arc::clone(&self.sessions);
        tokio::spawn(async move {
            sessions.handle_connect_signal().await;
        });
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("Gateway ready as {}", ready.user.name);
        self.signal();
    }

    async fn resume(&self, _ctx: Context, _event: ResumedEvent) {
        info!("Gateway session resumed");
        self.signal();
    }
}
