//! Integration tests for hydration and debounced write-through

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use player_state::{
    load_persisted_state, save_persisted_state, ManualScheduler, MemoryStorage, PersistKey,
    PersistedState, PersistenceConfig, StateKey, StateStore, Storage, StorageError, StorageSync,
    StoreConfig, TextTrack, TextTrackKind, TextTrackMode, TokioScheduler,
};

// ============================================================================
// Test Helpers
// ============================================================================

/// Storage whose every operation fails
struct BrokenStorage {
    attempts: Cell<u32>,
}

impl Storage for BrokenStorage {
    fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
        self.attempts.set(self.attempts.get() + 1);
        Err(StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read denied",
        )))
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        self.attempts.set(self.attempts.get() + 1);
        Err(StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "write denied",
        )))
    }

    fn remove_item(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

// ============================================================================
// Load / save
// ============================================================================

#[test]
fn test_corrupt_json_loads_defaults() {
    let storage = MemoryStorage::new();
    for raw in ["", "null", "{\"version\":1,\"state\":", "[1,2,3]", "{\"version\":\"1\"}"] {
        storage.insert_raw("player", raw);
        assert_eq!(load_persisted_state(&storage, "player"), PersistedState::default());
    }

    let store = StateStore::hydrated(&storage, "player", StoreConfig::default());
    assert_eq!(*store.state(), player_state::PlayerState::default());
}

#[test]
fn test_wrongly_typed_field_discards_record() {
    let storage = MemoryStorage::new();
    storage.insert_raw("player", r#"{"version":1,"state":{"volume":"loud","muted":true}}"#);
    assert!(load_persisted_state(&storage, "player").is_empty());
}

#[test]
fn test_unknown_fields_are_ignored() {
    let storage = MemoryStorage::new();
    storage.insert_raw(
        "player",
        r#"{"version":1,"state":{"muted":true,"theme":"dark"},"savedAt":123}"#,
    );
    assert_eq!(load_persisted_state(&storage, "player").muted, Some(true));
}

#[test]
fn test_throwing_storage_never_propagates() {
    let storage = BrokenStorage {
        attempts: Cell::new(0),
    };

    assert!(load_persisted_state(&storage, "player").is_empty());
    save_persisted_state(
        &storage,
        "player",
        &PersistedState {
            volume: Some(0.5),
            ..Default::default()
        },
    );
    assert_eq!(storage.attempts.get(), 2);
}

#[test]
fn test_quota_exceeded_write_is_dropped() {
    let storage = Rc::new(MemoryStorage::with_quota(16));
    let scheduler = Rc::new(ManualScheduler::new());
    let store = StateStore::new();
    let sync = StorageSync::new(
        &store,
        storage.clone(),
        scheduler.clone(),
        PersistenceConfig::new("player"),
    );

    store.set_volume(0.5);
    scheduler.advance(ms(250));
    assert_eq!(sync.write_count(), 1);
    assert_eq!(storage.peek("player"), None);
    assert_eq!(store.state().volume, 0.5);
}

#[test]
fn test_namespaces_are_independent() {
    let storage = MemoryStorage::new();
    save_persisted_state(
        &storage,
        "a",
        &PersistedState {
            muted: Some(true),
            ..Default::default()
        },
    );

    assert_eq!(load_persisted_state(&storage, "a").muted, Some(true));
    assert!(load_persisted_state(&storage, "b").is_empty());
}

// ============================================================================
// Round trip through a store
// ============================================================================

#[test]
fn test_session_round_trip() {
    let storage = Rc::new(MemoryStorage::new());
    let scheduler = Rc::new(ManualScheduler::new());

    {
        let store = StateStore::hydrated(&*storage, "player", StoreConfig::default());
        let _sync = StorageSync::new(
            &store,
            storage.clone(),
            scheduler.clone(),
            PersistenceConfig::new("player"),
        );

        store.volume_change(0.35, true);
        store.rate_change(1.25);
        store.text_tracks_change(vec![
            TextTrack::new("es", TextTrackKind::Subtitles, "es"),
            TextTrack::new("en", TextTrackKind::Captions, "en"),
        ]);
        store.set_text_track_mode("es", TextTrackMode::Showing);
        // session ends before the debounce fires; dropping the sync flushes
    }
    assert_eq!(storage.write_count(), 1);

    let store = StateStore::hydrated(&*storage, "player", StoreConfig::default());
    let state = store.state();
    assert_eq!(state.volume, 0.35);
    assert!(state.muted);
    assert_eq!(state.playback_rate, 1.25);
    assert_eq!(state.text_track_preference.as_deref(), Some("es"));
    // non-persisted fields start fresh
    assert!(state.text_tracks.is_empty());
}

#[test]
fn test_whitelist_limits_what_is_written() {
    let storage = Rc::new(MemoryStorage::new());
    let scheduler = Rc::new(ManualScheduler::new());
    let store = StateStore::new();
    let _sync = StorageSync::new(
        &store,
        storage.clone(),
        scheduler.clone(),
        PersistenceConfig::audio_only("player"),
    );

    store.batch(|s| {
        s.set_volume(0.8);
        s.rate_change(2.0);
    });
    scheduler.advance(ms(250));

    let persisted = load_persisted_state(&*storage, "player");
    assert_eq!(persisted.volume, Some(0.8));
    assert_eq!(persisted.muted, Some(false));
    assert_eq!(persisted.playback_rate, None);
}

#[test]
fn test_async_hydration_notifies_subscribers() {
    let storage = MemoryStorage::new();
    save_persisted_state(
        &storage,
        "player",
        &PersistedState {
            volume: Some(0.1),
            quality_preference: Some(1080),
            ..Default::default()
        },
    );

    let store = StateStore::new();
    let seen = Rc::new(Cell::new(None));
    let _sub = {
        let seen = Rc::clone(&seen);
        store.subscribe(StateKey::QualityPreference, move |s| seen.set(s.quality_preference))
    };

    // storage resolved after the store was built
    store.apply_persisted(&load_persisted_state(&storage, "player"));
    assert_eq!(seen.get(), Some(1080));
    assert_eq!(store.state().volume, 0.1);
}

// ============================================================================
// Debounce
// ============================================================================

#[test]
fn test_volume_drag_writes_once_after_settling() {
    let storage = Rc::new(MemoryStorage::new());
    let scheduler = Rc::new(ManualScheduler::new());
    let store = StateStore::new();
    let _sync = StorageSync::new(
        &store,
        storage.clone(),
        scheduler.clone(),
        PersistenceConfig::new("player").with_keys([PersistKey::Volume]),
    );

    for step in 0..10 {
        store.set_volume(step as f64 / 10.0);
        scheduler.advance(ms(20));
    }
    assert_eq!(storage.write_count(), 0);

    scheduler.advance(ms(300));
    assert_eq!(storage.write_count(), 1);
    assert_eq!(load_persisted_state(&*storage, "player").volume, Some(0.9));
}

#[tokio::test(start_paused = true)]
async fn test_tokio_scheduler_debounce() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let storage = Rc::new(MemoryStorage::new());
            let store = StateStore::new();
            let sync = StorageSync::new(
                &store,
                storage.clone(),
                Rc::new(TokioScheduler::new()),
                PersistenceConfig::new("player").with_debounce(ms(100)),
            );

            for step in 1..=5 {
                store.set_volume(step as f64 / 10.0);
                tokio::time::sleep(ms(10)).await;
            }
            assert_eq!(storage.write_count(), 0);

            tokio::time::sleep(ms(200)).await;
            assert_eq!(storage.write_count(), 1);
            assert_eq!(load_persisted_state(&*storage, "player").volume, Some(0.5));
            assert!(!sync.is_pending());
        })
        .await;
}
