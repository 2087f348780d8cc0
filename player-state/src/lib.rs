//! Player State Management
//!
//! The reactive state store that sits between a media engine and the widgets
//! of a video player UI.
//!
//! # Features
//!
//! - **Single Source of Truth**: one `StateStore` per player, written through
//!   named entry points (`time_update`, `progress`, `select_quality`, ...)
//! - **Fine-grained Subscriptions**: subscribe to one field or to any change;
//!   keyed subscribers run before wildcard subscribers, once per batch
//! - **Memoized Selectors**: derived values such as progress or "at live edge"
//!   recompute only when the fields they read change
//! - **Isolated Failures**: a panicking subscriber is reported to an error
//!   sink and never breaks the batch
//! - **Best-effort Persistence**: a whitelisted slice (volume, mute, rate,
//!   quality and caption preferences) survives restarts, with debounced writes
//!   and graceful fallback on corrupt or unavailable storage
//!
//! # Architecture
//!
//! ```text
//! Media engine ──entry points──▶ StateStore ──batch──▶ keyed subscribers
//!                                 │  (signals)          wildcard subscribers
//!                                 │
//!                                 ├──▶ DerivedState (computed selectors)
//!                                 └──▶ StorageSync ──debounce──▶ Storage
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use player_state::{StateKey, StateStore, Target};
//!
//! let store = StateStore::new();
//!
//! let _time = store.subscribe(StateKey::CurrentTime, |state| {
//!     println!("at {:.1}s", state.current_time);
//! });
//! let _any = store.subscribe(Target::Any, |state| {
//!     println!("paused: {}", state.paused);
//! });
//!
//! // One engine event, one notification pass
//! store.batch(|store| {
//!     store.duration_change(120.0);
//!     store.time_update(30.0);
//! });
//!
//! assert_eq!(store.computed().progress().get(), 0.25);
//! ```
//!
//! # Persistence
//!
//! ```rust
//! use std::rc::Rc;
//! use player_state::{
//!     ManualScheduler, MemoryStorage, PersistenceConfig, StateStore, StoreConfig, StorageSync,
//! };
//!
//! let storage = Rc::new(MemoryStorage::new());
//! let scheduler = Rc::new(ManualScheduler::new());
//!
//! // Hydrate from storage (falls back to defaults), then keep it in sync
//! let store = StateStore::hydrated(&*storage, "my-player", StoreConfig::default());
//! let sync = StorageSync::new(
//!     &store,
//!     storage.clone(),
//!     scheduler.clone(),
//!     PersistenceConfig::new("my-player"),
//! );
//!
//! store.set_muted(true);
//! sync.flush();
//!
//! let restored = StateStore::hydrated(&*storage, "my-player", StoreConfig::default());
//! assert!(restored.state().muted);
//! ```

// Core modules
pub mod model;
pub mod selectors;
pub mod store;

mod derived;

// Persistence
pub mod persistence;
pub mod scheduler;

// Widget lifecycle
pub mod lifecycle;

// Configuration and error types
pub mod config;
pub mod error;

// Logging infrastructure
pub mod logging;

// ============================================================================
// Re-exports - Store
// ============================================================================

pub use derived::DerivedState;
pub use store::StateStore;

pub use model::{
    AudioTrack, Availability, Feature, MediaError, MediaErrorCode, PlayerState, Quality,
    Readiness, StateKey, StreamType, Target, TextTrack, TextTrackKind, TextTrackMode, TimeRange,
    DEFAULT_LIVE_EDGE_TOLERANCE,
};

pub use selectors::{
    select_buffered_amount, select_buffered_end, select_current_audio_track,
    select_current_quality, select_current_text_track, select_is_at_live_edge, select_is_dvr,
    select_is_idle, select_is_live, select_is_loading, select_live_edge, select_progress,
    select_remaining_time,
};

// Reactive primitives used in the public API
pub use state_store::{Computed, Subscription};

// ============================================================================
// Re-exports - Persistence
// ============================================================================

pub use persistence::{
    load_persisted_state, save_persisted_state, try_load_persisted_state,
    try_save_persisted_state, MemoryStorage, PersistKey, PersistedState, Storage, StorageSync,
    PERSISTED_VERSION,
};
pub use scheduler::{ManualScheduler, Scheduler, TimerId, TokioScheduler};

pub use lifecycle::AttachScope;

// ============================================================================
// Re-exports - Configuration, errors, logging
// ============================================================================

pub use config::{ErrorSink, PersistenceConfig, StoreConfig, DEFAULT_NAMESPACE};
pub use error::{PersistError, Result, StorageError, SubscriberError};
pub use logging::{init_logging, init_logging_from_env, is_initialized, LoggingError, LoggingMode};

// ============================================================================
// Prelude
// ============================================================================

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::lifecycle::AttachScope;
    pub use crate::model::{PlayerState, StateKey, Target};
    pub use crate::persistence::{PersistKey, Storage, StorageSync};
    pub use crate::scheduler::Scheduler;
    pub use crate::store::StateStore;
    pub use state_store::Subscription;
}
