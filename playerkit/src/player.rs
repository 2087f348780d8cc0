//! Player - the context object owning one player's state
//!
//! A `Player` is constructed explicitly and passed to whatever needs it; there
//! is no process-wide instance. It owns the [`StateStore`], the optional
//! [`StorageSync`] and the media handler, and hands widgets a
//! [`PlayerHandle`].

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use player_state::{
    MemoryStorage, PersistKey, PersistenceConfig, PlayerState, Scheduler, StateStore, Storage,
    StorageSync, StoreConfig, SubscriberError,
};
use tracing::{debug, info, warn};

use crate::error::{PlayerError, Result};
use crate::handle::{MediaHandler, MediaRequest, PlayerHandle};
use crate::storage::FileStorage;

/// Configuration for a [`Player`]
#[derive(Debug, Clone, Default)]
pub struct PlayerConfig {
    pub store: StoreConfig,

    /// `None` disables persistence
    /// Default: disabled
    pub persistence: Option<PersistenceConfig>,
}

/// One player's state, persistence and widget capability
///
/// # Example
///
/// ```rust
/// use playerkit::Player;
///
/// let player = Player::builder()
///     .with_media_handler(|request| println!("engine should {request:?}"))
///     .build()
///     .unwrap();
///
/// // Engine side: report events
/// player.store().duration_change(60.0);
///
/// // Widget side: read and express intents
/// let handle = player.handle();
/// handle.request_play();
/// assert_eq!(handle.state().duration, 60.0);
/// ```
pub struct Player {
    store: StateStore,
    sync: Option<StorageSync>,
    media: Option<MediaHandler>,
}

impl Player {
    /// A player with default state and no persistence
    pub fn new() -> Self {
        Self {
            store: StateStore::new(),
            sync: None,
            media: None,
        }
    }

    pub fn builder() -> PlayerBuilder {
        PlayerBuilder::new()
    }

    /// The store, for the media engine to report events through
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Capability for widgets
    pub fn handle(&self) -> PlayerHandle {
        PlayerHandle::new(self.store.clone(), self.media.clone())
    }

    pub fn state(&self) -> Rc<PlayerState> {
        self.store.state()
    }

    /// Whether persistence is active
    pub fn is_persistent(&self) -> bool {
        self.sync.is_some()
    }

    /// Write pending persisted changes now
    pub fn flush(&self) {
        if let Some(sync) = &self.sync {
            sync.flush();
        }
    }

    /// Persist pending changes, drop every subscriber and stop accepting writes
    pub fn destroy(&mut self) {
        if let Some(sync) = self.sync.take() {
            sync.stop();
        }
        self.store.destroy();
        info!("Player destroyed");
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("store", &self.store)
            .field("sync", &self.sync)
            .field("has_media_handler", &self.media.is_some())
            .finish()
    }
}

/// Builder for [`Player`]
///
/// # Validation
///
/// `build()` fails when persistence is enabled and:
/// - the namespace is empty
/// - no scheduler was provided
/// - the key whitelist is empty
///
/// When no storage is provided, the platform data directory is used; if it
/// cannot be determined the player falls back to in-memory storage.
///
/// # Example
///
/// ```rust
/// use std::rc::Rc;
/// use std::time::Duration;
/// use playerkit::{ManualScheduler, MemoryStorage, Player};
///
/// let player = Player::builder()
///     .with_persistence("my-site")
///     .with_debounce(Duration::from_millis(500))
///     .with_storage(Rc::new(MemoryStorage::new()))
///     .with_scheduler(Rc::new(ManualScheduler::new()))
///     .build()
///     .unwrap();
///
/// assert!(player.is_persistent());
/// ```
#[derive(Default)]
pub struct PlayerBuilder {
    config: PlayerConfig,
    storage: Option<Rc<dyn Storage>>,
    scheduler: Option<Rc<dyn Scheduler>>,
    media: Option<MediaHandler>,
}

impl PlayerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a complete configuration
    pub fn with_config(mut self, config: PlayerConfig) -> Self {
        self.config = config;
        self
    }

    /// Persist under `namespace`
    ///
    /// Keys and debounce set before or after this call are kept; the default
    /// whitelist applies unless [`with_persisted_keys`](Self::with_persisted_keys)
    /// narrows it.
    pub fn with_persistence(mut self, namespace: impl Into<String>) -> Self {
        let mut config = self.persistence_config();
        config.namespace = namespace.into();
        self.config.persistence = Some(config);
        self
    }

    /// Persist only `keys`; enables persistence under the default namespace
    /// if it was not enabled yet
    pub fn with_persisted_keys(mut self, keys: impl IntoIterator<Item = PersistKey>) -> Self {
        let config = self.persistence_config().with_keys(keys);
        self.config.persistence = Some(config);
        self
    }

    /// Debounce interval for persisted writes; enables persistence under the
    /// default namespace if it was not enabled yet
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        let config = self.persistence_config().with_debounce(debounce);
        self.config.persistence = Some(config);
        self
    }

    fn persistence_config(&mut self) -> PersistenceConfig {
        self.config.persistence.take().unwrap_or_default()
    }

    pub fn with_storage(mut self, storage: Rc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Timers for debounced writes
    ///
    /// A [`TokioScheduler`](player_state::TokioScheduler) only fires inside a
    /// tokio `LocalSet`; elsewhere writes happen on [`Player::flush`] and
    /// [`Player::destroy`] only.
    pub fn with_scheduler(mut self, scheduler: Rc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Report subscriber failures to `sink` instead of the log
    pub fn with_error_sink(mut self, sink: impl Fn(&SubscriberError) + 'static) -> Self {
        self.config.store = self.config.store.with_error_sink(sink);
        self
    }

    /// Receive the requests widgets make of the media engine
    pub fn with_media_handler(mut self, handler: impl Fn(MediaRequest) + 'static) -> Self {
        self.media = Some(Rc::new(handler));
        self
    }

    pub fn build(self) -> Result<Player> {
        let Some(persistence) = self.config.persistence else {
            debug!("Building player without persistence");
            return Ok(Player {
                store: StateStore::with_config(self.config.store),
                sync: None,
                media: self.media,
            });
        };

        if persistence.namespace.trim().is_empty() {
            return Err(PlayerError::Config(
                "persistence namespace must not be empty".to_string(),
            ));
        }
        if persistence.keys.is_empty() {
            return Err(PlayerError::Config(
                "persistence needs at least one key".to_string(),
            ));
        }
        let scheduler = self.scheduler.ok_or_else(|| {
            PlayerError::Config("persistence needs a scheduler for debounced writes".to_string())
        })?;

        let storage: Rc<dyn Storage> = match self.storage {
            Some(storage) => storage,
            None => match FileStorage::in_data_dir() {
                Ok(files) => Rc::new(files),
                Err(e) => {
                    warn!(error = %e, "No data directory; persisted state will not survive restarts");
                    Rc::new(MemoryStorage::new())
                }
            },
        };

        let store = StateStore::hydrated(&*storage, &persistence.namespace, self.config.store);
        info!(namespace = %persistence.namespace, "Player hydrated from storage");
        let sync = StorageSync::new(&store, storage, scheduler, persistence);

        Ok(Player {
            store,
            sync: Some(sync),
            media: self.media,
        })
    }
}
