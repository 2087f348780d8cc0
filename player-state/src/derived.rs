//! The store's built-in computed values
//!
//! Each value is a [`Computed`] over exactly the field signals its selector
//! reads, so a `time_update` invalidates `progress` but never
//! `current_quality`. Nothing is recomputed until it is read.

use std::rc::Rc;

use state_store::{AsSource, Computed};

use crate::model::{AudioTrack, FieldSignals, PlayerState, Quality, StateKey, TextTrack};
use crate::selectors::*;

/// Build a computed value over `keys` from a selector
///
/// `select` receives the full snapshot but is only re-run when one of `keys`
/// changed; it must not read any other field.
pub(crate) fn derive<T: 'static>(
    fields: &FieldSignals,
    snapshot: &Computed<Rc<PlayerState>>,
    keys: &[StateKey],
    select: impl Fn(&PlayerState) -> T + 'static,
) -> Computed<T> {
    let sources: Vec<&dyn AsSource> = keys.iter().map(|key| fields.source(*key)).collect();
    let snapshot = snapshot.clone();
    Computed::new(&sources, move || snapshot.with(|state| select(state)))
}

/// Memoized derived values, available through [`StateStore::computed`]
///
/// [`StateStore::computed`]: crate::StateStore::computed
pub struct DerivedState {
    progress: Computed<f64>,
    buffered_amount: Computed<f64>,
    buffered_end: Computed<f64>,
    remaining_time: Computed<f64>,
    is_idle: Computed<bool>,
    is_loading: Computed<bool>,
    is_live: Computed<bool>,
    is_dvr: Computed<bool>,
    live_edge: Computed<Option<f64>>,
    is_at_live_edge: Computed<bool>,
    current_quality: Computed<Option<Quality>>,
    current_text_track: Computed<Option<TextTrack>>,
    current_audio_track: Computed<Option<AudioTrack>>,
}

impl DerivedState {
    pub(crate) fn new(fields: &FieldSignals, snapshot: &Computed<Rc<PlayerState>>) -> Self {
        use StateKey::*;

        let d = |keys: &[StateKey], select: fn(&PlayerState) -> f64| {
            derive(fields, snapshot, keys, select)
        };
        let b = |keys: &[StateKey], select: fn(&PlayerState) -> bool| {
            derive(fields, snapshot, keys, select)
        };

        Self {
            progress: d(&[CurrentTime, Duration], select_progress),
            buffered_amount: d(&[CurrentTime, Duration, Buffered], select_buffered_amount),
            buffered_end: d(&[Buffered], select_buffered_end),
            remaining_time: d(&[CurrentTime, Duration], select_remaining_time),
            is_idle: b(&[Readiness], select_is_idle),
            is_loading: b(&[Readiness], select_is_loading),
            is_live: b(&[StreamType], select_is_live),
            is_dvr: b(&[StreamType], select_is_dvr),
            live_edge: derive(fields, snapshot, &[StreamType, Seekable], select_live_edge),
            is_at_live_edge: b(
                &[StreamType, Seekable, CurrentTime, LiveEdgeTolerance],
                select_is_at_live_edge,
            ),
            current_quality: derive(fields, snapshot, &[Qualities], |state| {
                select_current_quality(state).cloned()
            }),
            current_text_track: derive(fields, snapshot, &[TextTracks], |state| {
                select_current_text_track(state).cloned()
            }),
            current_audio_track: derive(fields, snapshot, &[AudioTracks], |state| {
                select_current_audio_track(state).cloned()
            }),
        }
    }

    pub fn progress(&self) -> &Computed<f64> {
        &self.progress
    }

    pub fn buffered_amount(&self) -> &Computed<f64> {
        &self.buffered_amount
    }

    pub fn buffered_end(&self) -> &Computed<f64> {
        &self.buffered_end
    }

    pub fn remaining_time(&self) -> &Computed<f64> {
        &self.remaining_time
    }

    pub fn is_idle(&self) -> &Computed<bool> {
        &self.is_idle
    }

    pub fn is_loading(&self) -> &Computed<bool> {
        &self.is_loading
    }

    pub fn is_live(&self) -> &Computed<bool> {
        &self.is_live
    }

    pub fn is_dvr(&self) -> &Computed<bool> {
        &self.is_dvr
    }

    pub fn live_edge(&self) -> &Computed<Option<f64>> {
        &self.live_edge
    }

    pub fn is_at_live_edge(&self) -> &Computed<bool> {
        &self.is_at_live_edge
    }

    pub fn current_quality(&self) -> &Computed<Option<Quality>> {
        &self.current_quality
    }

    pub fn current_text_track(&self) -> &Computed<Option<TextTrack>> {
        &self.current_text_track
    }

    pub fn current_audio_track(&self) -> &Computed<Option<AudioTrack>> {
        &self.current_audio_track
    }
}
