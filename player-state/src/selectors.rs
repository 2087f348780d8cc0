//! Pure projections of [`PlayerState`]
//!
//! Selectors hold no state and have no side effects. They are the stable
//! read-side API for derived values and are what the store's built-in
//! computed values are made of.
//!
//! Selectors never panic on malformed upstream data: when the engine reports
//! two selected qualities or two showing caption tracks, the first match wins.

use crate::model::{AudioTrack, PlayerState, Quality, Readiness, StreamType, TextTrack};

/// Fraction of the media played, in `[0, 1]`
pub fn select_progress(state: &PlayerState) -> f64 {
    if state.duration > 0.0 && state.duration.is_finite() && state.current_time.is_finite() {
        (state.current_time / state.duration).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Fraction of the media buffered ahead of the playhead, in `[0, 1]`
///
/// Uses the range containing `current_time`, or failing that the last range
/// starting at or before it.
pub fn select_buffered_amount(state: &PlayerState) -> f64 {
    if !(state.duration > 0.0 && state.duration.is_finite()) {
        return 0.0;
    }
    let time = state.current_time;
    let range = state
        .buffered
        .iter()
        .find(|range| range.contains(time))
        .or_else(|| state.buffered.iter().rev().find(|range| range.start <= time));

    match range {
        Some(range) => ((range.end - time) / state.duration).clamp(0.0, 1.0),
        None => 0.0,
    }
}

/// End of the furthest buffered range, or 0 when nothing is buffered
pub fn select_buffered_end(state: &PlayerState) -> f64 {
    state.buffered.last().map(|range| range.end).unwrap_or(0.0)
}

/// Seconds left until the end, never negative
pub fn select_remaining_time(state: &PlayerState) -> f64 {
    let remaining = state.duration - state.current_time;
    if remaining.is_finite() {
        remaining.max(0.0)
    } else {
        0.0
    }
}

/// Whether nothing is loaded
///
/// An unknown readiness is never idle.
pub fn select_is_idle(state: &PlayerState) -> bool {
    matches!(state.readiness, Some(Readiness::Empty))
}

/// Whether the player is waiting for data
///
/// An unknown readiness counts as loading.
pub fn select_is_loading(state: &PlayerState) -> bool {
    matches!(
        state.readiness,
        None | Some(Readiness::Loading) | Some(Readiness::Stalled)
    )
}

pub fn select_is_live(state: &PlayerState) -> bool {
    matches!(state.stream_type, StreamType::Live | StreamType::LiveDvr)
}

pub fn select_is_dvr(state: &PlayerState) -> bool {
    state.stream_type == StreamType::LiveDvr
}

/// Most recent seekable time of a live stream
pub fn select_live_edge(state: &PlayerState) -> Option<f64> {
    if !select_is_live(state) {
        return None;
    }
    state.seekable.last().map(|range| range.end)
}

/// Whether a live stream is playing within tolerance of its live edge
///
/// A live stream with no seekable range yet is considered at the edge.
pub fn select_is_at_live_edge(state: &PlayerState) -> bool {
    if !select_is_live(state) {
        return false;
    }
    match select_live_edge(state) {
        Some(edge) => state.current_time >= edge - state.live_edge_tolerance.max(0.0),
        None => true,
    }
}

/// The selected rendition, if any
pub fn select_current_quality(state: &PlayerState) -> Option<&Quality> {
    state.qualities.iter().find(|quality| quality.selected)
}

/// The showing caption or subtitle track, if any
///
/// Chapters, descriptions and metadata tracks may show alongside it and are
/// never the current track.
pub fn select_current_text_track(state: &PlayerState) -> Option<&TextTrack> {
    state
        .text_tracks
        .iter()
        .find(|track| track.kind.is_caption_like() && track.is_showing())
}

/// The enabled audio track, if any
pub fn select_current_audio_track(state: &PlayerState) -> Option<&AudioTrack> {
    state.audio_tracks.iter().find(|track| track.enabled)
}
