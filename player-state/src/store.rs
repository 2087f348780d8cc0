//! The player state store
//!
//! `StateStore` is the single source of truth between the playback engine and
//! the UI. Each field lives in its own [`Signal`](state_store::Signal); the
//! immutable [`PlayerState`] snapshot and every built-in derived value are
//! [`Computed`]s over those signals.
//!
//! # Batches
//!
//! Every write entry point is one batch, and [`StateStore::batch`] groups
//! several. Subscribers are notified once, after the outermost batch ends,
//! and only for what actually changed relative to the state they were last
//! shown:
//!
//! 1. keyed subscribers whose key changed, in subscription order
//! 2. wildcard subscribers, once, in subscription order
//!
//! Writes made by subscribers during a notification pass are applied
//! immediately and delivered together in one follow-up pass.
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use player_state::{StateKey, StateStore, Target, TimeRange};
//!
//! let store = StateStore::new();
//! let log = Rc::new(RefCell::new(Vec::new()));
//!
//! let _time = {
//!     let log = Rc::clone(&log);
//!     store.subscribe(StateKey::CurrentTime, move |s| log.borrow_mut().push(format!("time {}", s.current_time)))
//! };
//! let _any = {
//!     let log = Rc::clone(&log);
//!     store.subscribe(Target::Any, move |_| log.borrow_mut().push("any".to_string()))
//! };
//!
//! store.batch(|store| {
//!     store.time_update(12.0);
//!     store.progress(vec![TimeRange::new(0.0, 30.0)]);
//! });
//!
//! assert_eq!(*log.borrow(), vec!["time 12", "any"]);
//! ```

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use state_store::{AsSource, Computed, Detach, ObserverList, Subscription};
use tracing::{debug, trace, warn};

use crate::config::{log_subscriber_error, ErrorSink, StoreConfig};
use crate::derived::{self, DerivedState};
use crate::error::SubscriberError;
use crate::model::{
    AudioTrack, Availability, FieldSignals, Feature, MediaError, PlayerState, Quality, Readiness,
    StateKey, StreamType, Target, TextTrack, TextTrackMode, TimeRange,
};
use crate::persistence::{load_persisted_state, PersistedState, Storage};

/// Follow-up passes allowed per flush before remaining changes are deferred
const MAX_FLUSH_PASSES: usize = 64;

/// Handle to a player state store
///
/// Cloning produces another handle to the same store.
#[derive(Clone)]
pub struct StateStore {
    inner: Rc<StoreInner>,
}

struct StoreInner {
    fields: Rc<FieldSignals>,
    snapshot: Computed<Rc<PlayerState>>,
    derived: DerivedState,
    subscribers: ObserverList<PlayerState, Target>,
    /// The state subscribers were last notified about
    delivered: RefCell<Rc<PlayerState>>,
    depth: Cell<u32>,
    flushing: Cell<bool>,
    destroyed: Cell<bool>,
    batches: Cell<u64>,
    error_sink: ErrorSink,
}

/// Resets a flag when dropped
struct FlagGuard<'a>(&'a Cell<bool>);

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Leaves the current batch level when dropped
struct DepthGuard<'a>(&'a Cell<u32>);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

impl StoreInner {
    fn flush(&self) {
        if self.depth.get() > 0 || self.flushing.get() {
            return;
        }
        self.flushing.set(true);
        let _guard = FlagGuard(&self.flushing);

        for _ in 0..MAX_FLUSH_PASSES {
            let next = self.snapshot.get();
            let previous = Rc::clone(&self.delivered.borrow());
            if Rc::ptr_eq(&previous, &next) {
                return;
            }

            let changed: Vec<StateKey> = StateKey::ALL
                .iter()
                .copied()
                .filter(|key| key.differs(&previous, &next))
                .collect();
            *self.delivered.borrow_mut() = Rc::clone(&next);
            if changed.is_empty() {
                return;
            }

            self.batches.set(self.batches.get() + 1);
            debug!(
                batch = self.batches.get(),
                changed = ?changed,
                subscribers = self.subscribers.len(),
                "Flushing state batch"
            );
            self.deliver(&next, &changed);
        }
        warn!(
            passes = MAX_FLUSH_PASSES,
            "Subscribers kept writing during notification; deferring remaining changes"
        );
    }

    fn deliver(&self, state: &PlayerState, changed: &[StateKey]) {
        let observers = self.subscribers.snapshot();

        let keyed = observers.iter().filter(|observer| match observer.key() {
            Target::Key(key) => changed.contains(key),
            Target::Any => false,
        });
        let wildcard = observers
            .iter()
            .filter(|observer| *observer.key() == Target::Any);

        for observer in keyed.chain(wildcard) {
            trace!(id = observer.id(), target = %observer.key(), "Notifying subscriber");
            let result = panic::catch_unwind(AssertUnwindSafe(|| observer.call(state)));
            if let Err(payload) = result {
                let err = SubscriberError::Panicked {
                    id: observer.id(),
                    target: *observer.key(),
                    message: panic_message(payload.as_ref()),
                };
                self.report(&err);
            }
        }
    }

    /// Hand a subscriber failure to the sink; a panicking sink falls back to
    /// the log so the rest of the batch is still delivered
    fn report(&self, err: &SubscriberError) {
        let sink = &self.error_sink;
        if panic::catch_unwind(AssertUnwindSafe(|| sink(err))).is_err() {
            log_subscriber_error(err);
        }
    }
}

impl Detach for StoreInner {
    fn detach(&self, id: u64) {
        if self.subscribers.remove(id) {
            trace!(id, "Subscriber released");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl StateStore {
    /// Create a store with default state and configuration
    pub fn new() -> Self {
        Self::with_state(PlayerState::default(), StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self::with_state(PlayerState::default(), config)
    }

    /// Create a store starting from `initial`
    ///
    /// The initial state is not delivered to subscribers.
    pub fn with_state(initial: PlayerState, config: StoreConfig) -> Self {
        let fields = Rc::new(FieldSignals::new(initial));

        let snapshot = {
            let sources: Vec<&dyn AsSource> =
                StateKey::ALL.iter().map(|key| fields.source(*key)).collect();
            let fields = Rc::clone(&fields);
            Computed::new(&sources, move || Rc::new(fields.snapshot()))
        };
        let derived = DerivedState::new(&fields, &snapshot);
        let delivered = RefCell::new(snapshot.get());

        Self {
            inner: Rc::new(StoreInner {
                fields,
                snapshot,
                derived,
                subscribers: ObserverList::new(),
                delivered,
                depth: Cell::new(0),
                flushing: Cell::new(false),
                destroyed: Cell::new(false),
                batches: Cell::new(0),
                error_sink: config.error_sink,
            }),
        }
    }

    /// Create a store hydrated from the persisted record for `namespace`
    ///
    /// Any problem with the record falls back to defaults.
    pub fn hydrated<S: Storage + ?Sized>(storage: &S, namespace: &str, config: StoreConfig) -> Self {
        let persisted = load_persisted_state(storage, namespace);
        Self::with_state(PlayerState::with_persisted(&persisted), config)
    }

    /// Current immutable snapshot
    ///
    /// Repeated calls return the same `Rc` until something changes.
    pub fn state(&self) -> Rc<PlayerState> {
        self.inner.snapshot.get()
    }

    /// Built-in derived values
    pub fn computed(&self) -> &DerivedState {
        &self.inner.derived
    }

    /// A custom derived value over `keys`
    ///
    /// `select` is re-run only after one of `keys` changed, so it must not
    /// read any other field.
    pub fn derive<T: 'static>(
        &self,
        keys: &[StateKey],
        select: impl Fn(&PlayerState) -> T + 'static,
    ) -> Computed<T> {
        derived::derive(&self.inner.fields, &self.inner.snapshot, keys, select)
    }

    /// Register a callback for a key or for any change
    ///
    /// After a destroy this returns an inert handle and registers nothing.
    pub fn subscribe(
        &self,
        target: impl Into<Target>,
        callback: impl FnMut(&PlayerState) + 'static,
    ) -> Subscription {
        let target = target.into();
        if self.inner.destroyed.get() {
            debug!(%target, "Subscribe on destroyed store ignored");
            return Subscription::inert();
        }
        let id = self.inner.subscribers.insert(target, Box::new(callback));
        trace!(id, %target, "Subscriber registered");

        let owner: Rc<dyn Detach> = self.inner.clone();
        Subscription::new(id, Rc::downgrade(&owner))
    }

    /// Apply several writes as one notification batch
    ///
    /// Nested batches join the outermost one.
    pub fn batch<R>(&self, f: impl FnOnce(&StateStore) -> R) -> R {
        let result = {
            self.inner.depth.set(self.inner.depth.get() + 1);
            let _depth = DepthGuard(&self.inner.depth);
            f(self)
        };
        self.inner.flush();
        result
    }

    /// Drop every subscriber and stop accepting writes
    pub fn destroy(&self) {
        if self.inner.destroyed.replace(true) {
            return;
        }
        debug!(
            subscribers = self.inner.subscribers.len(),
            "Destroying state store"
        );
        self.inner.subscribers.clear();
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Number of notification passes delivered so far
    pub fn batch_count(&self) -> u64 {
        self.inner.batches.get()
    }

    fn write<R: Default>(&self, event: &'static str, f: impl FnOnce(&FieldSignals) -> R) -> R {
        if self.inner.destroyed.get() {
            trace!(event, "Write to destroyed store ignored");
            return R::default();
        }
        trace!(event, "Applying write");
        self.batch(|store| f(&store.inner.fields))
    }

    // ========================================================================
    // Timeline
    // ========================================================================

    pub fn time_update(&self, current_time: f64) {
        self.write("time_update", |f| {
            f.current_time.set(current_time);
        })
    }

    pub fn duration_change(&self, duration: f64) {
        self.write("duration_change", |f| {
            f.duration.set(duration);
        })
    }

    /// Buffered ranges reported by the engine
    pub fn progress(&self, buffered: Vec<TimeRange>) {
        self.write("progress", |f| {
            f.buffered.set(buffered);
        })
    }

    pub fn seekable_change(&self, seekable: Vec<TimeRange>) {
        self.write("seekable_change", |f| {
            f.seekable.set(seekable);
        })
    }

    pub fn seeking_change(&self, seeking: bool) {
        self.write("seeking_change", |f| {
            f.seeking.set(seeking);
        })
    }

    pub fn stream_type_change(&self, stream_type: StreamType) {
        self.write("stream_type_change", |f| {
            f.stream_type.set(stream_type);
        })
    }

    pub fn readiness_change(&self, readiness: Readiness) {
        self.write("readiness_change", |f| {
            f.readiness.set(Some(readiness));
        })
    }

    /// Seconds behind the live edge still treated as "at" the edge
    pub fn set_live_edge_tolerance(&self, tolerance: f64) {
        self.write("set_live_edge_tolerance", |f| {
            f.live_edge_tolerance.set(tolerance);
        })
    }

    // ========================================================================
    // Playback
    // ========================================================================

    /// Playback started; clears `ended`
    pub fn play(&self) {
        self.write("play", |f| {
            f.paused.set(false);
            f.ended.set(false);
        })
    }

    pub fn pause(&self) {
        self.write("pause", |f| {
            f.paused.set(true);
        })
    }

    /// Reaching the end also pauses
    pub fn ended_change(&self, ended: bool) {
        self.write("ended_change", |f| {
            f.ended.set(ended);
            if ended {
                f.paused.set(true);
            }
        })
    }

    pub fn rate_change(&self, playback_rate: f64) {
        self.write("rate_change", |f| {
            f.playback_rate.set(playback_rate);
        })
    }

    // ========================================================================
    // Audio
    // ========================================================================

    /// Engine-reported volume and mute, applied together
    pub fn volume_change(&self, volume: f64, muted: bool) {
        self.write("volume_change", |f| {
            f.volume.set(volume);
            f.muted.set(muted);
        })
    }

    /// Volume is stored as given; callers clamp
    pub fn set_volume(&self, volume: f64) {
        self.write("set_volume", |f| {
            f.volume.set(volume);
        })
    }

    pub fn set_muted(&self, muted: bool) {
        self.write("set_muted", |f| {
            f.muted.set(muted);
        })
    }

    // ========================================================================
    // Renditions and tracks
    // ========================================================================

    pub fn qualities_change(&self, qualities: Vec<Quality>) {
        self.write("qualities_change", |f| {
            f.qualities.set(qualities);
        })
    }

    /// Pin the rendition at `index`, turning automatic selection off
    ///
    /// Returns `false` (and changes nothing) for an unknown index.
    pub fn select_quality(&self, index: usize) -> bool {
        self.write("select_quality", |f| {
            let mut qualities = f.qualities.get();
            let Some(height) = qualities.get(index).map(|quality| quality.height) else {
                debug!(index, available = qualities.len(), "Unknown quality index");
                return false;
            };
            for (i, quality) in qualities.iter_mut().enumerate() {
                quality.selected = i == index;
            }
            f.qualities.set(qualities);
            f.auto_quality.set(false);
            f.quality_preference.set(Some(height));
            true
        })
    }

    /// Selection flags are left as the engine reports them
    pub fn set_auto_quality(&self, auto: bool) {
        self.write("set_auto_quality", |f| {
            f.auto_quality.set(auto);
        })
    }

    pub fn text_tracks_change(&self, text_tracks: Vec<TextTrack>) {
        self.write("text_tracks_change", |f| {
            f.text_tracks.set(text_tracks);
        })
    }

    /// Change the mode of one text track
    ///
    /// Showing a track disables every other showing track of its group.
    /// Changing a caption or subtitle track updates the caption language
    /// preference. Returns `false` for an unknown id.
    pub fn set_text_track_mode(&self, id: &str, mode: TextTrackMode) -> bool {
        self.write("set_text_track_mode", |f| {
            let mut tracks = f.text_tracks.get();
            let Some(kind) = tracks.iter().find(|track| track.id == id).map(|track| track.kind)
            else {
                debug!(id, "Unknown text track");
                return false;
            };

            for track in tracks.iter_mut() {
                if track.id == id {
                    track.mode = mode;
                } else if mode == TextTrackMode::Showing
                    && track.is_showing()
                    && track.kind.shares_group(kind)
                {
                    track.mode = TextTrackMode::Disabled;
                }
            }

            if kind.is_caption_like() {
                let preference = tracks
                    .iter()
                    .find(|track| track.kind.is_caption_like() && track.is_showing())
                    .map(|track| track.language.clone());
                f.text_track_preference.set(preference);
            }
            f.text_tracks.set(tracks);
            true
        })
    }

    pub fn audio_tracks_change(&self, audio_tracks: Vec<AudioTrack>) {
        self.write("audio_tracks_change", |f| {
            f.audio_tracks.set(audio_tracks);
        })
    }

    /// Enable one audio track and disable the rest
    ///
    /// Returns `false` for an unknown id.
    pub fn select_audio_track(&self, id: &str) -> bool {
        self.write("select_audio_track", |f| {
            let mut tracks = f.audio_tracks.get();
            if !tracks.iter().any(|track| track.id == id) {
                debug!(id, "Unknown audio track");
                return false;
            }
            for track in tracks.iter_mut() {
                track.enabled = track.id == id;
            }
            f.audio_tracks.set(tracks);
            true
        })
    }

    // ========================================================================
    // Presentation
    // ========================================================================

    pub fn availability_change(&self, feature: Feature, availability: Availability) {
        self.write("availability_change", |f| {
            let signal = match feature {
                Feature::Fullscreen => &f.fullscreen_availability,
                Feature::Pip => &f.pip_availability,
                Feature::Volume => &f.volume_availability,
            };
            signal.set(availability);
        })
    }

    pub fn set_controls_visible(&self, visible: bool) {
        self.write("set_controls_visible", |f| {
            f.controls_visible.set(visible);
        })
    }

    pub fn fullscreen_change(&self, fullscreen: bool) {
        self.write("fullscreen_change", |f| {
            f.fullscreen.set(fullscreen);
        })
    }

    pub fn pip_change(&self, pip: bool) {
        self.write("pip_change", |f| {
            f.pip.set(pip);
        })
    }

    pub fn set_error(&self, error: MediaError) {
        self.write("set_error", |f| {
            f.error.set(Some(error));
        })
    }

    pub fn clear_error(&self) {
        self.write("clear_error", |f| {
            f.error.set(None);
        })
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Apply a persisted slice as a normal batch
    ///
    /// Used for hydration that completes after construction; subscribers are
    /// notified as for any other write.
    pub fn apply_persisted(&self, persisted: &PersistedState) {
        self.write("apply_persisted", |f| {
            if let Some(volume) = persisted.volume {
                f.volume.set(volume);
            }
            if let Some(muted) = persisted.muted {
                f.muted.set(muted);
            }
            if let Some(rate) = persisted.playback_rate {
                f.playback_rate.set(rate);
            }
            if let Some(height) = persisted.quality_preference {
                f.quality_preference.set(Some(height));
            }
            if let Some(language) = &persisted.text_track_preference {
                f.text_track_preference.set(Some(language.clone()));
            }
        })
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("subscribers", &self.inner.subscribers.len())
            .field("batches", &self.inner.batches.get())
            .field("destroyed", &self.inner.destroyed.get())
            .finish()
    }
}
