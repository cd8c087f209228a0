//! Channel lookup over the Discord REST API

use async_trait::async_trait;
use serenity::all::{Channel, ChannelType, Http};
use std::sync::Arc;
use tracing::debug;

use crate::channel::{ChannelDirectory, ChannelId, ChannelInfo, ChannelKind, GuildId};
use crate::error::{Error, Result};

pub struct SerenityChannels {
    http: Arc<Http>,
}

impl SerenityChannels {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

fn channel_kind(kind: ChannelType) -> ChannelKind {
    match kind {
        ChannelType::Voice => ChannelKind::Voice,
        ChannelType::Stage => ChannelKind::Stage,
        ChannelType::Text | ChannelType::News => ChannelKind::Text,
        ChannelType::Category => ChannelKind::Category,
        ChannelType::Private => ChannelKind::Private,
        _ => ChannelKind::Other,
    }
}

fn is_not_found(err: &serenity::Error) -> bool {
    match err {
        serenity::Error::Http(e) => e.status_code().map(|s| s.as_u16()) == Some(404),
        _ => false,
    }
}

#[async_trait]
impl ChannelDirectory for SerenityChannels {
    async fn fetch_channel(&self, id: ChannelId) -> Result<Option<ChannelInfo>> {
        let target = serenity::all::ChannelId::new(id.get());

        let channel = match target.to_channel(self.http.as_ref()).await {
            Ok(channel) => channel,
            Err(e) if is_not_found(&e) => {
                debug!(channel_id = %id, "Channel lookup returned 404");
                return Ok(None);
            }
            Err(e) => return Err(Error::Transport(e.to_string())),
        };

        let info = match channel {
            Channel::Guild(gc) => ChannelInfo {
                id,
                guild_id: Some(GuildId::new(gc.guild_id.get())),
                kind: channel_kind(gc.kind),
                name: gc.name,
            },
            Channel::Private(pc) => ChannelInfo {
                id,
                guild_id: None,
                kind: ChannelKind::Private,
                name: pc.name(),
            },
            _ => ChannelInfo {
                id,
                guild_id: None,
                kind: ChannelKind::Other,
                name: String::new(),
            },
        };
        Ok(Some(info))
    }
}
