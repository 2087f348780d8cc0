//! Best-effort persistence of a whitelisted slice of player state
//!
//! One record is kept per namespace, under the namespace itself as the
//! storage key:
//!
//! ```json
//! {"version": 1, "state": {"volume": 0.4, "muted": false}}
//! ```
//!
//! Nothing here ever fails playback. [`load_persisted_state`] degrades to an
//! empty slice and [`save_persisted_state`] drops failed writes; both log the
//! reason. The `try_` variants expose the underlying [`PersistError`] for
//! callers that want it.

mod storage;
mod sync;

pub use storage::{MemoryStorage, Storage};
pub use sync::StorageSync;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{PersistError, Result};
use crate::model::{PlayerState, StateKey};

/// Version tag written with every record; other versions are discarded
pub const PERSISTED_VERSION: u32 = 1;

/// A field that may be persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PersistKey {
    Volume,
    Muted,
    PlaybackRate,
    QualityPreference,
    TextTrackPreference,
}

impl PersistKey {
    pub const ALL: &'static [PersistKey] = &[
        PersistKey::Volume,
        PersistKey::Muted,
        PersistKey::PlaybackRate,
        PersistKey::QualityPreference,
        PersistKey::TextTrackPreference,
    ];

    /// The store field backing this key
    pub fn state_key(self) -> StateKey {
        match self {
            PersistKey::Volume => StateKey::Volume,
            PersistKey::Muted => StateKey::Muted,
            PersistKey::PlaybackRate => StateKey::PlaybackRate,
            PersistKey::QualityPreference => StateKey::QualityPreference,
            PersistKey::TextTrackPreference => StateKey::TextTrackPreference,
        }
    }
}

/// The persisted slice; absent fields were not persisted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub muted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playback_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_preference: Option<u32>,
    /// Caption language; absent when captions are off
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_track_preference: Option<String>,
}

impl PersistedState {
    /// Copy the whitelisted fields out of a snapshot
    pub fn capture(state: &PlayerState, keys: &[PersistKey]) -> Self {
        let mut slice = Self::default();
        for key in keys {
            match key {
                PersistKey::Volume => slice.volume = Some(state.volume),
                PersistKey::Muted => slice.muted = Some(state.muted),
                PersistKey::PlaybackRate => slice.playback_rate = Some(state.playback_rate),
                PersistKey::QualityPreference => {
                    slice.quality_preference = state.quality_preference
                }
                PersistKey::TextTrackPreference => {
                    slice.text_track_preference = state.text_track_preference.clone()
                }
            }
        }
        slice
    }

    /// Overwrite the present fields of `state`
    pub fn apply_to(&self, state: &mut PlayerState) {
        if let Some(volume) = self.volume {
            state.volume = volume;
        }
        if let Some(muted) = self.muted {
            state.muted = muted;
        }
        if let Some(rate) = self.playback_rate {
            state.playback_rate = rate;
        }
        if let Some(height) = self.quality_preference {
            state.quality_preference = Some(height);
        }
        if let Some(language) = &self.text_track_preference {
            state.text_track_preference = Some(language.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl PlayerState {
    /// Default state with a persisted slice applied
    pub fn with_persisted(persisted: &PersistedState) -> Self {
        let mut state = Self::default();
        persisted.apply_to(&mut state);
        state
    }
}

#[derive(Serialize)]
struct RecordOut<'a> {
    version: u32,
    state: &'a PersistedState,
}

#[derive(Deserialize)]
struct RecordIn {
    version: u32,
    #[serde(default)]
    state: serde_json::Value,
}

/// Read the record for `namespace`, reporting why it could not be used
///
/// A missing record is not an error: it yields an empty slice.
pub fn try_load_persisted_state<S: Storage + ?Sized>(
    storage: &S,
    namespace: &str,
) -> Result<PersistedState> {
    let Some(raw) = storage.get_item(namespace)? else {
        return Ok(PersistedState::default());
    };

    let record: RecordIn = serde_json::from_str(&raw)?;
    if record.version != PERSISTED_VERSION {
        return Err(PersistError::VersionMismatch {
            found: record.version,
            expected: PERSISTED_VERSION,
        });
    }
    if record.state.is_null() {
        return Ok(PersistedState::default());
    }
    Ok(serde_json::from_value(record.state)?)
}

/// Read the record for `namespace`, falling back to an empty slice
pub fn load_persisted_state<S: Storage + ?Sized>(storage: &S, namespace: &str) -> PersistedState {
    match try_load_persisted_state(storage, namespace) {
        Ok(slice) => {
            debug!(namespace, empty = slice.is_empty(), "Loaded persisted state");
            slice
        }
        Err(e) => {
            warn!(namespace, error = %e, "Discarding persisted state");
            PersistedState::default()
        }
    }
}

/// Serialize and write the record for `namespace`
pub fn try_save_persisted_state<S: Storage + ?Sized>(
    storage: &S,
    namespace: &str,
    slice: &PersistedState,
) -> Result<()> {
    let json = serde_json::to_string(&RecordOut {
        version: PERSISTED_VERSION,
        state: slice,
    })?;
    storage.set_item(namespace, &json)?;
    Ok(())
}

/// Write the record for `namespace`, dropping the write on failure
pub fn save_persisted_state<S: Storage + ?Sized>(
    storage: &S,
    namespace: &str,
    slice: &PersistedState,
) {
    match try_save_persisted_state(storage, namespace, slice) {
        Ok(()) => debug!(namespace, "Saved persisted state"),
        Err(e) => warn!(namespace, error = %e, "Dropping persisted state write"),
    }
}
