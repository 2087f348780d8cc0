//! Debounced write-through of the persisted slice

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use state_store::Subscription;
use tracing::{debug, trace};

use super::{save_persisted_state, PersistedState, Storage};
use crate::config::PersistenceConfig;
use crate::model::StateKey;
use crate::scheduler::{Scheduler, TimerId};
use crate::store::StateStore;

/// Keeps the persisted record for a namespace in step with a store
///
/// Changes to the configured keys are written after a trailing debounce, so
/// a volume drag produces one write once it settles instead of one per
/// frame. When `max_wait` is set, a stream of changes that never settles
/// still writes at least that often.
///
/// ```rust
/// use std::rc::Rc;
/// use std::time::Duration;
/// use player_state::{
///     load_persisted_state, ManualScheduler, MemoryStorage, PersistenceConfig, StateStore,
///     StorageSync,
/// };
///
/// let store = StateStore::new();
/// let storage = Rc::new(MemoryStorage::new());
/// let scheduler = Rc::new(ManualScheduler::new());
/// let sync = StorageSync::new(
///     &store,
///     storage.clone(),
///     scheduler.clone(),
///     PersistenceConfig::new("demo"),
/// );
///
/// for step in 1..=10 {
///     store.set_volume(step as f64 / 10.0);
/// }
/// scheduler.advance(Duration::from_millis(250));
///
/// assert_eq!(storage.write_count(), 1);
/// assert_eq!(load_persisted_state(&*storage, "demo").volume, Some(1.0));
/// # drop(sync);
/// ```
pub struct StorageSync {
    inner: Rc<SyncInner>,
}

struct SyncInner {
    this: Weak<SyncInner>,
    store: StateStore,
    storage: Rc<dyn Storage>,
    scheduler: Rc<dyn Scheduler>,
    config: PersistenceConfig,
    subscriptions: RefCell<Vec<Subscription>>,
    debounce_timer: Cell<Option<TimerId>>,
    max_wait_timer: Cell<Option<TimerId>>,
    dirty: Cell<bool>,
    stopped: Cell<bool>,
    writes: Cell<u64>,
}

impl SyncInner {
    fn on_change(&self) {
        if self.stopped.get() {
            return;
        }
        self.dirty.set(true);

        if let Some(timer) = self.debounce_timer.take() {
            self.scheduler.cancel(timer);
        }
        let timer = self.schedule_write(self.config.debounce);
        self.debounce_timer.set(Some(timer));

        if let Some(max_wait) = self.config.max_wait {
            if self.max_wait_timer.get().is_none() {
                let timer = self.schedule_write(max_wait);
                self.max_wait_timer.set(Some(timer));
            }
        }
    }

    fn schedule_write(&self, delay: std::time::Duration) -> TimerId {
        let this = self.this.clone();
        self.scheduler.schedule(
            delay,
            Box::new(move || {
                if let Some(sync) = this.upgrade() {
                    sync.flush();
                }
            }),
        )
    }

    fn cancel_timers(&self) {
        for timer in [self.debounce_timer.take(), self.max_wait_timer.take()]
            .into_iter()
            .flatten()
        {
            self.scheduler.cancel(timer);
        }
    }

    fn flush(&self) {
        self.cancel_timers();
        if !self.dirty.replace(false) {
            return;
        }
        let slice = PersistedState::capture(&self.store.state(), &self.config.keys);
        trace!(namespace = %self.config.namespace, ?slice, "Writing persisted state");
        save_persisted_state(&*self.storage, &self.config.namespace, &slice);
        self.writes.set(self.writes.get() + 1);
    }
}

impl StorageSync {
    /// Start syncing `config.keys` of `store` to `storage`
    pub fn new(
        store: &StateStore,
        storage: Rc<dyn Storage>,
        scheduler: Rc<dyn Scheduler>,
        config: PersistenceConfig,
    ) -> Self {
        let inner = Rc::new_cyclic(|this| SyncInner {
            this: this.clone(),
            store: store.clone(),
            storage,
            scheduler,
            config,
            subscriptions: RefCell::new(Vec::new()),
            debounce_timer: Cell::new(None),
            max_wait_timer: Cell::new(None),
            dirty: Cell::new(false),
            stopped: Cell::new(false),
            writes: Cell::new(0),
        });

        let mut keys: Vec<StateKey> = inner.config.keys.iter().map(|k| k.state_key()).collect();
        keys.sort();
        keys.dedup();

        let subscriptions = keys
            .into_iter()
            .map(|key| {
                let sync = Rc::downgrade(&inner);
                store.subscribe(key, move |_| {
                    if let Some(sync) = sync.upgrade() {
                        sync.on_change();
                    }
                })
            })
            .collect();
        *inner.subscriptions.borrow_mut() = subscriptions;

        debug!(
            namespace = %inner.config.namespace,
            keys = ?inner.config.keys,
            debounce_ms = inner.config.debounce.as_millis() as u64,
            "Storage sync started"
        );
        Self { inner }
    }

    /// Write pending changes now
    pub fn flush(&self) {
        self.inner.flush();
    }

    /// Write pending changes and stop listening. Calling this again is a no-op.
    pub fn stop(&self) {
        if self.inner.stopped.replace(true) {
            return;
        }
        self.inner.flush();
        let subscriptions: Vec<Subscription> =
            self.inner.subscriptions.borrow_mut().drain(..).collect();
        drop(subscriptions);
        debug!(namespace = %self.inner.config.namespace, "Storage sync stopped");
    }

    /// Whether a change is waiting to be written
    pub fn is_pending(&self) -> bool {
        self.inner.dirty.get()
    }

    /// Number of writes attempted so far
    pub fn write_count(&self) -> u64 {
        self.inner.writes.get()
    }

    pub fn namespace(&self) -> &str {
        &self.inner.config.namespace
    }
}

impl Drop for StorageSync {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for StorageSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageSync")
            .field("namespace", &self.inner.config.namespace)
            .field("pending", &self.inner.dirty.get())
            .field("writes", &self.inner.writes.get())
            .field("stopped", &self.inner.stopped.get())
            .finish()
    }
}
