//! Integration tests for the player context and widget handle

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use proptest::prelude::*;

use playerkit::{
    AttachScope, Availability, Feature, FileStorage, ManualScheduler, MediaRequest,
    MemoryStorage, PersistKey, Player, PlayerError, Quality, StateKey, Storage, TextTrack,
    TextTrackKind, TextTrackMode,
};

// ============================================================================
// Test Helpers
// ============================================================================

/// Player whose media requests are collected into the returned log
fn recording_player() -> (Player, Rc<RefCell<Vec<MediaRequest>>>) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let player = {
        let log = Rc::clone(&log);
        Player::builder()
            .with_media_handler(move |request| log.borrow_mut().push(request))
            .build()
            .unwrap()
    };
    (player, log)
}

fn persistent_player(storage: Rc<dyn Storage>, scheduler: Rc<ManualScheduler>) -> Player {
    Player::builder()
        .with_persistence("site")
        .with_storage(storage)
        .with_scheduler(scheduler)
        .build()
        .unwrap()
}

/// Strategy for volumes a slider might report, including out-of-range values
fn volume_strategy() -> impl Strategy<Value = f64> {
    -2.0f64..3.0
}

// ============================================================================
// Builder validation
// ============================================================================

#[test]
fn test_persistence_requires_scheduler() {
    let result = Player::builder()
        .with_persistence("site")
        .with_storage(Rc::new(MemoryStorage::new()))
        .build();
    assert!(matches!(result, Err(PlayerError::Config(_))));
}

#[test]
fn test_persistence_requires_namespace() {
    let result = Player::builder()
        .with_persistence("  ")
        .with_scheduler(Rc::new(ManualScheduler::new()))
        .build();
    assert!(matches!(result, Err(PlayerError::Config(_))));
}

#[test]
fn test_persistence_requires_keys() {
    let result = Player::builder()
        .with_persisted_keys(Vec::<PersistKey>::new())
        .with_scheduler(Rc::new(ManualScheduler::new()))
        .build();
    assert!(matches!(result, Err(PlayerError::Config(_))));
}

#[test]
fn test_default_player_is_not_persistent() {
    let player = Player::new();
    assert!(!player.is_persistent());
    assert!(player.state().paused);
}

// ============================================================================
// Media requests
// ============================================================================

#[test]
fn test_engine_intents_are_forwarded_not_recorded() {
    let (player, log) = recording_player();
    let handle = player.handle();

    handle.toggle_paused();
    handle.seek(-5.0);
    handle.seek(f64::NAN);
    handle.set_playback_rate(0.0);
    handle.set_playback_rate(1.5);

    assert_eq!(
        *log.borrow(),
        vec![
            MediaRequest::Play,
            MediaRequest::Seek { time: 0.0 },
            MediaRequest::SetPlaybackRate { rate: 1.5 },
        ]
    );
    // only the engine's report changes state
    assert!(player.state().paused);
    assert_eq!(player.state().playback_rate, 1.0);

    player.store().play();
    handle.toggle_paused();
    assert_eq!(log.borrow().last(), Some(&MediaRequest::Pause));
}

#[test]
fn test_fullscreen_request_needs_availability() {
    let (player, log) = recording_player();
    let handle = player.handle();

    handle.request_fullscreen(true);
    assert!(log.borrow().is_empty());

    player
        .store()
        .availability_change(Feature::Fullscreen, Availability::Available);
    handle.request_fullscreen(true);
    // leaving is always allowed
    handle.request_pip(false);

    assert_eq!(
        *log.borrow(),
        vec![
            MediaRequest::SetFullscreen { fullscreen: true },
            MediaRequest::SetPip { pip: false },
        ]
    );
}

#[test]
fn test_track_intents_record_and_forward() {
    let (player, log) = recording_player();
    let handle = player.handle();
    player
        .store()
        .qualities_change(vec![Quality::new(720), Quality::new(1080)]);
    player.store().text_tracks_change(vec![
        TextTrack::new("en", TextTrackKind::Captions, "en"),
        TextTrack::new("fr", TextTrackKind::Subtitles, "fr"),
    ]);

    assert!(handle.select_quality(1));
    assert!(!handle.select_quality(7));
    assert!(handle.set_text_track_mode("fr", TextTrackMode::Showing));
    assert!(!handle.select_audio_track("missing"));

    let state = handle.state();
    assert!(!state.auto_quality);
    assert_eq!(state.quality_preference, Some(1080));
    assert_eq!(state.text_track_preference.as_deref(), Some("fr"));
    assert_eq!(
        *log.borrow(),
        vec![
            MediaRequest::SelectQuality { index: 1 },
            MediaRequest::SetTextTrackMode {
                id: "fr".to_string(),
                mode: TextTrackMode::Showing,
            },
        ]
    );
}

#[test]
fn test_requests_without_handler_are_dropped() {
    let player = Player::new();
    let handle = player.handle();
    handle.request_play();
    handle.set_muted(true);
    assert!(player.state().muted);
}

#[test]
fn test_media_request_wire_format() {
    let json = serde_json::to_string(&MediaRequest::Seek { time: 3.5 }).unwrap();
    assert_eq!(json, r#"{"type":"seek","time":3.5}"#);

    let parsed: MediaRequest = serde_json::from_str(r#"{"type":"setMuted","muted":true}"#).unwrap();
    assert_eq!(parsed, MediaRequest::SetMuted { muted: true });
}

// ============================================================================
// Widget lifecycle
// ============================================================================

#[test]
fn test_scope_subscriptions_end_on_detach() {
    let player = Player::new();
    let handle = player.handle();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let scope = AttachScope::new("time-label");
    scope.attach();
    {
        let seen = Rc::clone(&seen);
        handle.subscribe_in(&scope, StateKey::CurrentTime, move |s| {
            seen.borrow_mut().push(s.current_time)
        });
    }

    player.store().time_update(1.0);
    scope.detach();
    player.store().time_update(2.0);

    assert_eq!(*seen.borrow(), vec![1.0]);
    assert_eq!(player.store().subscriber_count(), 0);
}

#[test]
fn test_destroy_stops_everything() {
    let mut player = Player::new();
    let handle = player.handle();
    let _sub = handle.subscribe(StateKey::Volume, |_| panic!("destroyed store notified"));

    player.destroy();
    handle.set_volume(0.2);

    assert!(player.store().is_destroyed());
    assert_eq!(player.state().volume, 1.0);
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_preferences_survive_restart_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let scheduler = Rc::new(ManualScheduler::new());

    {
        let mut player = persistent_player(
            Rc::new(FileStorage::new(dir.path())),
            scheduler.clone(),
        );
        let handle = player.handle();
        handle.set_volume(0.4);
        handle.set_muted(true);
        player.store().time_update(33.0);
        player.destroy();
    }
    assert!(dir.path().join("site.json").exists());

    let player = persistent_player(Rc::new(FileStorage::new(dir.path())), scheduler);
    let state = player.state();
    assert_eq!(state.volume, 0.4);
    assert!(state.muted);
    assert_eq!(state.current_time, 0.0);
}

#[test]
fn test_writes_are_debounced_until_flush() {
    let storage = Rc::new(MemoryStorage::new());
    let scheduler = Rc::new(ManualScheduler::new());
    let player = Player::builder()
        .with_persisted_keys([PersistKey::Volume])
        .with_debounce(Duration::from_millis(100))
        .with_storage(storage.clone())
        .with_scheduler(scheduler.clone())
        .build()
        .unwrap();

    player.handle().set_volume(0.3);
    player.handle().set_volume(0.6);
    assert_eq!(storage.write_count(), 0);

    player.flush();
    assert_eq!(storage.write_count(), 1);
    scheduler.advance(Duration::from_secs(1));
    assert_eq!(storage.write_count(), 1);
}

#[test]
fn test_builder_persistence_options_are_order_independent() {
    let storage = Rc::new(MemoryStorage::new());
    let scheduler = Rc::new(ManualScheduler::new());
    let player = Player::builder()
        .with_persisted_keys([PersistKey::Muted])
        .with_debounce(Duration::from_secs(5))
        .with_persistence("site")
        .with_storage(storage.clone())
        .with_scheduler(scheduler.clone())
        .build()
        .unwrap();

    player.handle().set_volume(0.3);
    player.handle().set_muted(true);
    scheduler.advance(Duration::from_millis(300));
    assert_eq!(storage.write_count(), 0);

    scheduler.advance(Duration::from_secs(5));
    assert_eq!(storage.write_count(), 1);

    let record: serde_json::Value =
        serde_json::from_str(&storage.peek("site").unwrap()).unwrap();
    assert_eq!(record["state"], serde_json::json!({ "muted": true }));
}

#[test]
fn test_corrupt_record_starts_from_defaults() {
    let storage = Rc::new(MemoryStorage::new());
    storage.insert_raw("site", "{not json");

    let player = persistent_player(storage, Rc::new(ManualScheduler::new()));
    assert_eq!(player.state().volume, 1.0);
    assert!(!player.state().muted);
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    #[test]
    fn prop_handle_volume_is_clamped(volume in volume_strategy()) {
        let (player, log) = recording_player();
        player.handle().set_volume(volume);

        let stored = player.state().volume;
        prop_assert!((0.0..=1.0).contains(&stored));
        prop_assert_eq!(stored, volume.clamp(0.0, 1.0));
        let requests = log.borrow();
        prop_assert_eq!(
            requests.as_slice(),
            &[MediaRequest::SetVolume { volume: stored }][..]
        );
    }
}
