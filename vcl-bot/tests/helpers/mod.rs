//! Test doubles for the platform seams
//!
//! - FakeDirectory: scripted channel lookups
//! - FakeGateway / FakeSession: in-memory voice sessions that record rejoins
//! - FakeSink: records player commands and reports `started` immediately;
//!   its position is set by the test
//! - RecordingSleeper: records retry delays without waiting

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use vcl_bot::channel::{ChannelDirectory, ChannelInfo, ChannelKind};
use vcl_bot::error::Result;
use vcl_bot::playback::{AudioResource, AudioSink, PlaybackEngine, SinkNotifier};
use vcl_bot::retry::{RetryPolicy, Sleeper};
use vcl_bot::voice::{JoinOptions, VoiceConnector, VoiceGateway, VoiceSession};
use vcl_bot::{ChannelId, ChannelResolver, Error, GuildId, SessionManager};
use vcl_common::{BotEvent, EventBus};

pub const CHANNEL: u64 = 1_100_000_000_000_000_001;
pub const GUILD: u64 = 1_000_000_000_000_000_001;

pub fn voice_channel() -> ChannelInfo {
    ChannelInfo {
        id: ChannelId::new(CHANNEL),
        guild_id: Some(GuildId::new(GUILD)),
        kind: ChannelKind::Voice,
        name: "radio".to_string(),
    }
}

pub fn text_channel() -> ChannelInfo {
    ChannelInfo {
        kind: ChannelKind::Text,
        name: "general".to_string(),
        ..voice_channel()
    }
}

// ============================================================================
// Channel directory
// ============================================================================

/// Answers lookups from a script, then with the voice channel forever
#[derive(Default)]
pub struct FakeDirectory {
    script: Mutex<VecDeque<Result<Option<ChannelInfo>>>>,
    calls: Mutex<u32>,
}

impl FakeDirectory {
    pub fn scripted(script: Vec<Result<Option<ChannelInfo>>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ChannelDirectory for FakeDirectory {
    async fn fetch_channel(&self, id: ChannelId) -> Result<Option<ChannelInfo>> {
        assert_eq!(id, ChannelId::new(CHANNEL), "looked up the wrong channel");
        *self.calls.lock().unwrap() += 1;
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Some(voice_channel())))
    }
}

// ============================================================================
// Sleeper
// ============================================================================

#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

// ============================================================================
// Audio sink
// ============================================================================

#[derive(Default)]
pub struct FakeSink {
    calls: Mutex<Vec<String>>,
    notifiers: Mutex<Vec<SinkNotifier>>,
    position: Mutex<Option<Duration>>,
}

impl FakeSink {
    /// Pretend the sink has streamed this far into its resource
    pub fn set_position(&self, position: Duration) {
        *self.position.lock().unwrap() = Some(position);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.calls().iter().any(|c| c == "stop")
    }

    pub fn last_notifier(&self) -> Option<SinkNotifier> {
        self.notifiers.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl AudioSink for FakeSink {
    async fn start(
        &self,
        resource: Arc<AudioResource>,
        offset: Duration,
        notifier: SinkNotifier,
    ) -> Result<()> {
        let call = if offset.is_zero() {
            format!("start:{}", resource.generation())
        } else {
            format!("start:{}@{}", resource.generation(), offset.as_millis())
        };
        self.calls.lock().unwrap().push(call);
        notifier.started();
        self.notifiers.lock().unwrap().push(notifier);
        Ok(())
    }

    async fn position(&self) -> Option<Duration> {
        *self.position.lock().unwrap()
    }

    async fn stop(&self) -> Result<()> {
        self.calls.lock().unwrap().push("stop".into());
        Ok(())
    }
}

// ============================================================================
// Voice sessions
// ============================================================================

pub struct FakeSession {
    guild_id: GuildId,
    rejoins: Mutex<Vec<JoinOptions>>,
    sinks: Mutex<Vec<Arc<FakeSink>>>,
    fail_rejoin: bool,
}

impl FakeSession {
    pub fn new(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            rejoins: Mutex::new(Vec::new()),
            sinks: Mutex::new(Vec::new()),
            fail_rejoin: false,
        }
    }

    pub fn failing_rejoin(guild_id: GuildId) -> Self {
        Self {
            fail_rejoin: true,
            ..Self::new(guild_id)
        }
    }

    pub fn rejoins(&self) -> Vec<JoinOptions> {
        self.rejoins.lock().unwrap().clone()
    }

    pub fn sinks(&self) -> Vec<Arc<FakeSink>> {
        self.sinks.lock().unwrap().clone()
    }

    pub fn last_sink(&self) -> Arc<FakeSink> {
        self.sinks().last().cloned().expect("no sink opened")
    }
}

#[async_trait]
impl VoiceSession for FakeSession {
    fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    async fn rejoin(&self, options: &JoinOptions) -> Result<()> {
        self.rejoins.lock().unwrap().push(*options);
        if self.fail_rejoin {
            return Err(Error::Voice("gateway shard unavailable".into()));
        }
        Ok(())
    }

    fn open_sink(&self) -> Arc<dyn AudioSink> {
        let sink = Arc::new(FakeSink::default());
        self.sinks.lock().unwrap().push(Arc::clone(&sink));
        sink
    }
}

#[derive(Default)]
pub struct FakeGateway {
    sessions: Mutex<HashMap<GuildId, Arc<FakeSession>>>,
    created: Mutex<u32>,
}

impl FakeGateway {
    /// Pretend the voice library already holds `session`
    pub fn with_session(session: Arc<FakeSession>) -> Self {
        let gateway = Self::default();
        gateway
            .sessions
            .lock()
            .unwrap()
            .insert(session.guild_id, session);
        gateway
    }

    pub fn created(&self) -> u32 {
        *self.created.lock().unwrap()
    }

    pub fn fake_session(&self, guild_id: GuildId) -> Option<Arc<FakeSession>> {
        self.sessions.lock().unwrap().get(&guild_id).cloned()
    }
}

#[async_trait]
impl VoiceGateway for FakeGateway {
    fn session(&self, guild_id: GuildId) -> Option<Arc<dyn VoiceSession>> {
        self.fake_session(guild_id)
            .map(|s| s as Arc<dyn VoiceSession>)
    }

    async fn create_session(&self, options: &JoinOptions) -> Arc<dyn VoiceSession> {
        *self.created.lock().unwrap() += 1;
        let session = Arc::new(FakeSession::new(options.guild_id));
        self.sessions
            .lock()
            .unwrap()
            .insert(options.guild_id, Arc::clone(&session));
        session
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub manager: Arc<SessionManager>,
    pub directory: Arc<FakeDirectory>,
    pub gateway: Arc<FakeGateway>,
    pub sleeper: Arc<RecordingSleeper>,
    pub events: Arc<EventBus>,
}

impl Harness {
    pub fn new(directory: FakeDirectory, gateway: FakeGateway) -> Self {
        let directory = Arc::new(directory);
        let gateway = Arc::new(gateway);
        let sleeper = Arc::new(RecordingSleeper::default());
        let events = Arc::new(EventBus::new(1024));

        let resolver = ChannelResolver::new(
            directory.clone(),
            CHANNEL.to_string(),
            RetryPolicy::unbounded(Duration::from_millis(5000)),
            sleeper.clone(),
            Arc::clone(&events),
        );
        let connector = VoiceConnector::new(gateway.clone(), Arc::clone(&events));
        let playback = PlaybackEngine::new(PathBuf::from("royalty.ogg"), Arc::clone(&events));
        let manager = Arc::new(SessionManager::new(
            resolver,
            connector,
            playback,
            Arc::clone(&events),
        ));

        Self {
            manager,
            directory,
            gateway,
            sleeper,
            events,
        }
    }

    pub fn session(&self) -> Arc<FakeSession> {
        self.gateway
            .fake_session(GuildId::new(GUILD))
            .expect("no voice session for guild")
    }
}

/// Collect whatever has been emitted so far
pub fn drain_events(rx: &mut tokio::sync::broadcast::Receiver<BotEvent>) -> Vec<BotEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Poll `condition` until it holds, letting spawned tasks run in between
pub async fn eventually<F, Fut>(what: &str, mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..400 {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for: {what}");
}
