//! # Playerkit - state for video player UIs
//!
//! Wires a reactive [`StateStore`] to persistence and hands widgets a narrow
//! capability:
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use playerkit::{MediaRequest, Player, StateKey};
//!
//! let requests = Rc::new(RefCell::new(Vec::new()));
//! let player = {
//!     let requests = Rc::clone(&requests);
//!     Player::builder()
//!         .with_media_handler(move |request| requests.borrow_mut().push(request))
//!         .build()
//!         .unwrap()
//! };
//!
//! // A widget reads, subscribes and asks
//! let handle = player.handle();
//! let _label = handle.subscribe(StateKey::CurrentTime, |state| {
//!     println!("{:.0}s", state.current_time);
//! });
//! handle.seek(42.0);
//! assert_eq!(requests.borrow()[0], MediaRequest::Seek { time: 42.0 });
//!
//! // The engine reports what happened
//! player.store().time_update(42.0);
//! assert_eq!(handle.state().current_time, 42.0);
//! ```
//!
//! ## Key Features
//!
//! - **Explicit context**: one [`Player`] per player instance, no globals
//! - **Two sides**: the engine writes through [`Player::store`], widgets get a
//!   [`PlayerHandle`] that can read, subscribe and request
//! - **Persistence**: volume, mute, rate and track preferences survive
//!   restarts through [`FileStorage`] or any [`Storage`]
//! - **Scoped subscriptions**: [`AttachScope`] releases a widget's
//!   subscriptions when it detaches
//!
//! ## Architecture
//!
//! ```text
//! playerkit (Player, PlayerHandle, FileStorage)
//!     ↓
//! player-state (StateStore, selectors, persistence)
//!     ↓
//! state-store (Signal, Computed, Subscription)
//! ```

// Main exports
pub use error::{PlayerError, Result};
pub use handle::{MediaHandler, MediaRequest, PlayerHandle};
pub use player::{Player, PlayerBuilder, PlayerConfig};
pub use storage::{FileStorage, DATA_DIR_NAME};

// Re-export commonly used types from player-state
pub use player_state::{
    init_logging, init_logging_from_env, AttachScope, Availability, DerivedState, Feature,
    LoggingError, LoggingMode, ManualScheduler, MediaError, MemoryStorage, PersistKey, PersistenceConfig,
    PlayerState, Quality, Readiness, Scheduler, StateKey, StateStore, Storage, StorageError,
    StoreConfig, StreamType, Subscription, SubscriberError, Target, TextTrack, TextTrackKind,
    TextTrackMode, TimeRange, TokioScheduler,
};

// Internal modules
mod error;
mod handle;
mod player;
mod storage;
