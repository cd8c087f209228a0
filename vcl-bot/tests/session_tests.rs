//! Connect sequence integration tests
//!
//! Drives `SessionManager::on_connect` end to end against in-memory fakes
//! of the chat platform and voice library.

mod helpers;

use helpers::*;
use std::sync::Arc;
use std::time::Duration;
use vcl_bot::channel::ChannelKind;
use vcl_bot::playback::PlayerStatus;
use vcl_bot::{ChannelId, Error, GuildId};
use vcl_common::BotEvent;

// ============================================================================
// Channel resolution
// ============================================================================

/// **Given:** the channel lookup fails three times (transport, 404, wrong type)
/// **When:** a connect signal arrives
/// **Then:** the resolver sleeps 5000 ms after each failure and playback proceeds
#[tokio::test]
async fn test_resolution_retries_until_voice_channel() {
    let directory = FakeDirectory::scripted(vec![
        Err(Error::Transport("connection reset".into())),
        Ok(None),
        Ok(Some(text_channel())),
    ]);
    let h = Harness::new(directory, FakeGateway::default());
    let mut rx = h.events.subscribe();

    h.manager.on_connect().await.unwrap();

    assert_eq!(h.directory.calls(), 4);
    assert_eq!(h.sleeper.delays(), vec![Duration::from_millis(5000); 3]);

    let events = drain_events(&mut rx);
    let retries = events
        .iter()
        .filter(|e| matches!(e, BotEvent::RetryScheduled { .. }))
        .count();
    assert_eq!(retries, 3);
    assert!(events.iter().any(|e| matches!(
        e,
        BotEvent::ChannelResolved { channel_id, guild_id, .. }
            if *channel_id == CHANNEL && *guild_id == GUILD
    )));

    let sink = h.session().last_sink();
    assert_eq!(sink.calls(), vec!["start:1"]);
}

/// **Given:** the configured id first points at a text channel
/// **When:** the operator fixes the channel type while the bot retries
/// **Then:** resolution reports the wrong type, then succeeds
#[tokio::test]
async fn test_wrong_channel_type_then_corrected() {
    let directory = FakeDirectory::scripted(vec![Ok(Some(text_channel()))]);
    let h = Harness::new(directory, FakeGateway::default());
    let mut rx = h.events.subscribe();

    h.manager.on_connect().await.unwrap();

    let events = drain_events(&mut rx);
    let retry_error = events
        .iter()
        .find_map(|e| match e {
            BotEvent::RetryScheduled { error, .. } => Some(error.clone()),
            _ => None,
        })
        .expect("no retry scheduled");
    assert!(retry_error.contains(&format!("found {}", ChannelKind::Text)));
    assert_eq!(h.sleeper.delays().len(), 1);
    assert_eq!(h.session().sinks().len(), 1);
}

/// **Given:** the directory adapter fails with an error that is not a
///           lookup failure
/// **When:** a connect signal arrives
/// **Then:** the resolver still waits 5000 ms and tries again, and the
///           sequence completes
#[tokio::test]
async fn test_unexpected_directory_error_is_retried() {
    let directory = FakeDirectory::scripted(vec![Err(Error::Player("adapter bug".into()))]);
    let h = Harness::new(directory, FakeGateway::default());

    h.manager.on_connect().await.unwrap();

    assert_eq!(h.directory.calls(), 2);
    assert_eq!(h.sleeper.delays(), vec![Duration::from_millis(5000)]);
    assert!(h.manager.snapshot().await.subscription_live);
}

// ============================================================================
// Voice connection
// ============================================================================

/// **Given:** the voice library already holds a session for the guild
/// **When:** a connect signal arrives
/// **Then:** the session is reused and a rejoin (unmuted, deafened) is issued
#[tokio::test]
async fn test_existing_session_reused_and_rejoined() {
    let existing = Arc::new(FakeSession::new(GuildId::new(GUILD)));
    let h = Harness::new(
        FakeDirectory::default(),
        FakeGateway::with_session(Arc::clone(&existing)),
    );
    let mut rx = h.events.subscribe();

    h.manager.on_connect().await.unwrap();

    assert_eq!(h.gateway.created(), 0);
    let rejoins = existing.rejoins();
    assert_eq!(rejoins.len(), 1);
    assert_eq!(rejoins[0].channel_id, ChannelId::new(CHANNEL));
    assert!(!rejoins[0].self_mute);
    assert!(rejoins[0].self_deaf);

    let events = drain_events(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, BotEvent::VoiceSessionReady { reused: true, .. })));
}

/// **Given:** the rejoin request fails
/// **When:** a connect signal arrives
/// **Then:** the sequence still completes with a live subscription
#[tokio::test]
async fn test_rejoin_failure_does_not_abort_sequence() {
    let existing = Arc::new(FakeSession::failing_rejoin(GuildId::new(GUILD)));
    let h = Harness::new(
        FakeDirectory::default(),
        FakeGateway::with_session(Arc::clone(&existing)),
    );

    h.manager.on_connect().await.unwrap();

    let snapshot = h.manager.snapshot().await;
    assert!(snapshot.subscription_live);
    assert_eq!(existing.sinks().len(), 1);
}

// ============================================================================
// Reconnects
// ============================================================================

/// **Given:** a bot that has connected once
/// **When:** two more connect signals arrive
/// **Then:** the player is created once, the session is created once and
///           rejoined every time
#[tokio::test]
async fn test_player_and_session_survive_reconnects() {
    let h = Harness::new(FakeDirectory::default(), FakeGateway::default());
    let mut rx = h.events.subscribe();

    for _ in 0..3 {
        h.manager.on_connect().await.unwrap();
    }

    let events = drain_events(&mut rx);
    let created = events
        .iter()
        .filter(|e| matches!(e, BotEvent::PlayerCreated { .. }))
        .count();
    assert_eq!(created, 1);

    let connects: Vec<bool> = events
        .iter()
        .filter_map(|e| match e {
            BotEvent::Connected { reconnect, .. } => Some(*reconnect),
            _ => None,
        })
        .collect();
    assert_eq!(connects, vec![false, true, true]);

    assert_eq!(h.gateway.created(), 1);
    assert_eq!(h.session().rejoins().len(), 3);
    assert_eq!(h.manager.snapshot().await.completed_sequences, 3);
}

/// **Given:** a connected bot
/// **When:** two reconnects arrive back to back
/// **Then:** each releases the previous subscription before creating one;
///           exactly one subscription is live, on the latest sink
#[tokio::test]
async fn test_back_to_back_reconnects_keep_one_subscription() {
    let h = Harness::new(FakeDirectory::default(), FakeGateway::default());
    let mut rx = h.events.subscribe();

    h.manager.on_connect().await.unwrap();
    h.manager.on_connect().await.unwrap();
    let latest = h.manager.on_connect().await.unwrap();

    let sinks = h.session().sinks();
    assert_eq!(sinks.len(), 3);
    assert!(sinks[0].is_stopped());
    assert!(sinks[1].is_stopped());
    assert!(!sinks[2].is_stopped());

    let player = h.manager.playback().existing_player().unwrap().clone();
    assert_eq!(player.subscriber_count().await, 1);

    let snapshot = h.manager.snapshot().await;
    assert_eq!(snapshot.subscription_id, Some(latest));
    assert!(snapshot.subscription_live);
    assert_eq!(snapshot.guild_id, Some(GuildId::new(GUILD)));

    // Every creation after the first is preceded by a release
    let order: Vec<&str> = drain_events(&mut rx)
        .iter()
        .filter_map(|e| match e {
            BotEvent::SubscriptionReleased { .. } => Some("released"),
            BotEvent::SubscriptionCreated { .. } => Some("created"),
            _ => None,
        })
        .collect();
    assert_eq!(
        order,
        vec!["created", "released", "created", "released", "created"]
    );
}

/// **Given:** a connected bot
/// **When:** two connect signals overlap
/// **Then:** they run one after the other and leave a single live subscription
#[tokio::test]
async fn test_overlapping_connect_signals_are_serialized() {
    let h = Harness::new(FakeDirectory::default(), FakeGateway::default());
    h.manager.on_connect().await.unwrap();

    let (a, b) = tokio::join!(h.manager.on_connect(), h.manager.on_connect());
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_ne!(a, b);

    let sinks = h.session().sinks();
    assert_eq!(sinks.len(), 3);
    assert_eq!(sinks.iter().filter(|s| !s.is_stopped()).count(), 1);

    let player = h.manager.playback().existing_player().unwrap().clone();
    assert_eq!(player.subscriber_count().await, 1);

    let snapshot = h.manager.snapshot().await;
    assert!(snapshot.subscription_id == Some(a) || snapshot.subscription_id == Some(b));
    assert_eq!(snapshot.completed_sequences, 3);
}

// ============================================================================
// Continuous playback
// ============================================================================

/// **Given:** audio is playing
/// **When:** the resource reaches its end
/// **Then:** a fresh resource is created and started on the live sink
#[tokio::test]
async fn test_playback_loops_after_end() {
    let h = Harness::new(FakeDirectory::default(), FakeGateway::default());
    h.manager.on_connect().await.unwrap();
    let player = h.manager.playback().existing_player().unwrap().clone();

    eventually("player playing", || {
        let player = player.clone();
        async move { player.status().await == PlayerStatus::Playing }
    })
    .await;

    let sink = h.session().last_sink();
    let first = player.current_resource().await.unwrap();
    sink.last_notifier().unwrap().ended();

    eventually("second resource started", || {
        let sink = Arc::clone(&sink);
        async move { sink.calls().contains(&"start:2".to_string()) }
    })
    .await;

    assert!(first.is_ended());
    let current = player.current_resource().await.unwrap();
    assert_eq!(current.generation(), 2);
    assert!(!current.is_ended());
}

/// **Given:** audio is playing
/// **When:** the sink reports a playback error
/// **Then:** the error is published and playback restarts with a new resource
#[tokio::test]
async fn test_player_error_restarts_playback() {
    let h = Harness::new(FakeDirectory::default(), FakeGateway::default());
    let mut rx = h.events.subscribe();
    h.manager.on_connect().await.unwrap();

    let sink = h.session().last_sink();
    sink.last_notifier().unwrap().failed("corrupt page");

    eventually("replay after error", || {
        let sink = Arc::clone(&sink);
        async move { sink.calls().contains(&"start:2".to_string()) }
    })
    .await;

    let events = drain_events(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        BotEvent::PlayerError { generation: 1, message, .. } if message == "corrupt page"
    )));
}

/// **Given:** a subscription was replaced by a reconnect
/// **When:** the released sink reports an end (its track was stopped)
/// **Then:** playback on the new sink is not disturbed
#[tokio::test]
async fn test_released_sink_reports_are_ignored() {
    let h = Harness::new(FakeDirectory::default(), FakeGateway::default());
    h.manager.on_connect().await.unwrap();
    let old = h.session().last_sink();
    old.set_position(Duration::from_secs(12));

    h.manager.on_connect().await.unwrap();
    let new = h.session().last_sink();
    old.last_notifier().unwrap().ended();

    let player = h.manager.playback().existing_player().unwrap().clone();
    eventually("player playing on new sink", || {
        let player = player.clone();
        async move { player.status().await == PlayerStatus::Playing }
    })
    .await;

    assert_eq!(player.current_resource().await.unwrap().generation(), 1);
    assert_eq!(new.calls(), vec!["start:1@12000"]);
}

/// **Given:** audio has been streaming for 95 seconds
/// **When:** the gateway resumes and the sink is rebound
/// **Then:** the new sink continues the same resource at 95 seconds instead
///           of restarting the asset
#[tokio::test]
async fn test_reconnect_continues_from_held_position() {
    let h = Harness::new(FakeDirectory::default(), FakeGateway::default());
    h.manager.on_connect().await.unwrap();
    let player = h.manager.playback().existing_player().unwrap().clone();
    eventually("player playing", || {
        let player = player.clone();
        async move { player.status().await == PlayerStatus::Playing }
    })
    .await;
    h.session().last_sink().set_position(Duration::from_secs(95));

    h.manager.on_connect().await.unwrap();

    let sinks = h.session().sinks();
    assert_eq!(sinks[0].calls(), vec!["start:1", "stop"]);
    assert_eq!(sinks[1].calls(), vec!["start:1@95000"]);
}
