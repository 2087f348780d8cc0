//! The capability handed to UI widgets
//!
//! Widgets never see the [`StateStore`] itself. A [`PlayerHandle`] lets them
//! read snapshots and derived values, subscribe, and express user intents.
//! Intents the media engine must carry out (play, seek, fullscreen, ...) are
//! forwarded to the host as [`MediaRequest`]s; the store learns the outcome
//! when the engine reports it.

use std::fmt;
use std::rc::Rc;

use player_state::{
    AttachScope, DerivedState, PlayerState, StateStore, Subscription, Target, TextTrackMode,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Something a widget asks the media engine to do
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MediaRequest {
    Play,
    Pause,
    Seek { time: f64 },
    SetVolume { volume: f64 },
    SetMuted { muted: bool },
    SetPlaybackRate { rate: f64 },
    SelectQuality { index: usize },
    SetAutoQuality { auto: bool },
    SetTextTrackMode { id: String, mode: TextTrackMode },
    SelectAudioTrack { id: String },
    SetFullscreen { fullscreen: bool },
    SetPip { pip: bool },
}

/// Receives media requests from widgets
pub type MediaHandler = Rc<dyn Fn(MediaRequest)>;

/// Read, subscribe and intent capability for one player
///
/// Cloning is cheap; every clone talks to the same player.
#[derive(Clone)]
pub struct PlayerHandle {
    store: StateStore,
    media: Option<MediaHandler>,
}

impl PlayerHandle {
    pub(crate) fn new(store: StateStore, media: Option<MediaHandler>) -> Self {
        Self { store, media }
    }

    // ========================================================================
    // Read
    // ========================================================================

    /// Current snapshot
    pub fn state(&self) -> Rc<PlayerState> {
        self.store.state()
    }

    /// Memoized derived values
    pub fn computed(&self) -> &DerivedState {
        self.store.computed()
    }

    // ========================================================================
    // Subscribe
    // ========================================================================

    pub fn subscribe(
        &self,
        target: impl Into<Target>,
        callback: impl FnMut(&PlayerState) + 'static,
    ) -> Subscription {
        self.store.subscribe(target, callback)
    }

    /// Subscribe for as long as `scope` stays attached
    pub fn subscribe_in(
        &self,
        scope: &AttachScope,
        target: impl Into<Target>,
        callback: impl FnMut(&PlayerState) + 'static,
    ) {
        scope.subscribe(&self.store, target, callback);
    }

    // ========================================================================
    // Engine intents
    // ========================================================================

    pub fn request_play(&self) {
        self.send(MediaRequest::Play);
    }

    pub fn request_pause(&self) {
        self.send(MediaRequest::Pause);
    }

    /// Play if paused, pause otherwise
    pub fn toggle_paused(&self) {
        if self.store.state().paused {
            self.request_play();
        } else {
            self.request_pause();
        }
    }

    /// Seek to `time` seconds; non-finite times are ignored
    pub fn seek(&self, time: f64) {
        if !time.is_finite() {
            debug!(time, "Ignoring seek to non-finite time");
            return;
        }
        self.send(MediaRequest::Seek {
            time: time.max(0.0),
        });
    }

    pub fn set_playback_rate(&self, rate: f64) {
        if !(rate.is_finite() && rate > 0.0) {
            debug!(rate, "Ignoring invalid playback rate");
            return;
        }
        self.send(MediaRequest::SetPlaybackRate { rate });
    }

    /// Ask for fullscreen; ignored unless the feature is available
    pub fn request_fullscreen(&self, fullscreen: bool) {
        if fullscreen && !self.store.state().fullscreen_availability.is_available() {
            debug!("Fullscreen requested but unavailable");
            return;
        }
        self.send(MediaRequest::SetFullscreen { fullscreen });
    }

    /// Ask for picture-in-picture; ignored unless the feature is available
    pub fn request_pip(&self, pip: bool) {
        if pip && !self.store.state().pip_availability.is_available() {
            debug!("Picture-in-picture requested but unavailable");
            return;
        }
        self.send(MediaRequest::SetPip { pip });
    }

    // ========================================================================
    // Intents recorded immediately and forwarded
    // ========================================================================

    /// Clamp to `0.0..=1.0`, record and forward; non-finite values are ignored
    pub fn set_volume(&self, volume: f64) {
        if !volume.is_finite() {
            debug!(volume, "Ignoring non-finite volume");
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        self.store.set_volume(volume);
        self.send(MediaRequest::SetVolume { volume });
    }

    pub fn set_muted(&self, muted: bool) {
        self.store.set_muted(muted);
        self.send(MediaRequest::SetMuted { muted });
    }

    pub fn toggle_muted(&self) {
        let muted = !self.store.state().muted;
        self.set_muted(muted);
    }

    /// Returns `false` for an unknown index
    pub fn select_quality(&self, index: usize) -> bool {
        let selected = self.store.select_quality(index);
        if selected {
            self.send(MediaRequest::SelectQuality { index });
        }
        selected
    }

    pub fn set_auto_quality(&self, auto: bool) {
        self.store.set_auto_quality(auto);
        self.send(MediaRequest::SetAutoQuality { auto });
    }

    /// Returns `false` for an unknown track id
    pub fn set_text_track_mode(&self, id: &str, mode: TextTrackMode) -> bool {
        let changed = self.store.set_text_track_mode(id, mode);
        if changed {
            self.send(MediaRequest::SetTextTrackMode {
                id: id.to_string(),
                mode,
            });
        }
        changed
    }

    /// Returns `false` for an unknown track id
    pub fn select_audio_track(&self, id: &str) -> bool {
        let selected = self.store.select_audio_track(id);
        if selected {
            self.send(MediaRequest::SelectAudioTrack { id: id.to_string() });
        }
        selected
    }

    // ========================================================================
    // UI-only state
    // ========================================================================

    pub fn set_controls_visible(&self, visible: bool) {
        self.store.set_controls_visible(visible);
    }

    fn send(&self, request: MediaRequest) {
        match &self.media {
            Some(handler) => {
                trace!(?request, "Forwarding media request");
                handler(request);
            }
            None => debug!(?request, "No media handler; dropping request"),
        }
    }
}

impl fmt::Debug for PlayerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerHandle")
            .field("store", &self.store)
            .field("has_media_handler", &self.media.is_some())
            .finish()
    }
}
