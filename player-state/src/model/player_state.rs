//! The aggregate player state and its field keys
//!
//! Every field is declared once in the `player_fields!` table below, which
//! generates:
//! - `PlayerState`, the immutable snapshot handed to subscribers
//! - `StateKey`, one variant per field
//! - `FieldSignals`, the store's per-field reactive cells

use std::fmt;

use state_store::{equals, same_value, AsSource, Signal};

use super::{
    AudioTrack, Availability, MediaError, Quality, Readiness, StreamType, TextTrack, TimeRange,
};

/// Default distance from the live edge, in seconds, still counted as "at" it
pub const DEFAULT_LIVE_EDGE_TOLERANCE: f64 = 10.0;

macro_rules! player_fields {
    (
        $(
            $(#[$doc:meta])*
            $field:ident: $ty:ty = $default:expr, $key:ident => $name:literal, eq $eq:expr;
        )*
    ) => {
        /// Snapshot of everything the UI can observe
        #[derive(Debug, Clone, PartialEq)]
        pub struct PlayerState {
            $(
                $(#[$doc])*
                pub $field: $ty,
            )*
        }

        impl Default for PlayerState {
            fn default() -> Self {
                Self {
                    $( $field: $default, )*
                }
            }
        }

        /// Identifies one field of [`PlayerState`]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum StateKey {
            $( $key, )*
        }

        impl StateKey {
            /// Every key, in declaration order
            pub const ALL: &'static [StateKey] = &[ $( StateKey::$key, )* ];

            /// Stable camelCase name, e.g. `"currentTime"`
            pub fn name(self) -> &'static str {
                match self {
                    $( StateKey::$key => $name, )*
                }
            }

            /// Look a key up by its camelCase name
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $( $name => Some(StateKey::$key), )*
                    _ => None,
                }
            }

            /// Whether this field differs between two snapshots
            ///
            /// Uses the same equality as the field's signal.
            pub fn differs(self, a: &PlayerState, b: &PlayerState) -> bool {
                match self {
                    $( StateKey::$key => !($eq)(&a.$field, &b.$field), )*
                }
            }
        }

        /// One reactive cell per field
        pub(crate) struct FieldSignals {
            $( pub(crate) $field: Signal<$ty>, )*
        }

        impl FieldSignals {
            pub(crate) fn new(initial: PlayerState) -> Self {
                Self {
                    $( $field: Signal::with_equality(initial.$field, $eq), )*
                }
            }

            pub(crate) fn snapshot(&self) -> PlayerState {
                PlayerState {
                    $( $field: self.$field.get(), )*
                }
            }

            pub(crate) fn source(&self, key: StateKey) -> &dyn AsSource {
                match key {
                    $( StateKey::$key => &self.$field, )*
                }
            }
        }
    };
}

player_fields! {
    /// Playback position in seconds
    current_time: f64 = 0.0, CurrentTime => "currentTime", eq same_value;
    /// Media duration in seconds; 0 or `NaN` while unknown
    duration: f64 = 0.0, Duration => "duration", eq same_value;
    paused: bool = true, Paused => "paused", eq equals;
    ended: bool = false, Ended => "ended", eq equals;
    seeking: bool = false, Seeking => "seeking", eq equals;
    muted: bool = false, Muted => "muted", eq equals;
    /// Volume in `0.0..=1.0`; not clamped by the store
    volume: f64 = 1.0, Volume => "volume", eq same_value;
    playback_rate: f64 = 1.0, PlaybackRate => "playbackRate", eq same_value;
    /// Buffered ranges, ascending and non-overlapping
    buffered: Vec<TimeRange> = Vec::new(), Buffered => "buffered", eq equals;
    /// Seekable ranges; the end of the last one is the live edge
    seekable: Vec<TimeRange> = Vec::new(), Seekable => "seekable", eq equals;
    stream_type: StreamType = StreamType::Vod, StreamType => "streamType", eq equals;
    /// Engine-reported readiness; `None` until the engine reports
    readiness: Option<Readiness> = None, Readiness => "readiness", eq equals;
    /// Renditions; at most one `selected` while `auto_quality` is off
    qualities: Vec<Quality> = Vec::new(), Qualities => "qualities", eq equals;
    auto_quality: bool = true, AutoQuality => "autoQuality", eq equals;
    /// Text tracks; at most one `Showing` per exclusive group
    text_tracks: Vec<TextTrack> = Vec::new(), TextTracks => "textTracks", eq equals;
    audio_tracks: Vec<AudioTrack> = Vec::new(), AudioTracks => "audioTracks", eq equals;
    fullscreen_availability: Availability = Availability::Unsupported,
        FullscreenAvailability => "fullscreenAvailability", eq equals;
    pip_availability: Availability = Availability::Unsupported,
        PipAvailability => "pipAvailability", eq equals;
    volume_availability: Availability = Availability::Unsupported,
        VolumeAvailability => "volumeAvailability", eq equals;
    controls_visible: bool = true, ControlsVisible => "controlsVisible", eq equals;
    fullscreen: bool = false, Fullscreen => "fullscreen", eq equals;
    pip: bool = false, Pip => "pip", eq equals;
    error: Option<MediaError> = None, Error => "error", eq equals;
    /// Preferred rendition height, kept across sessions
    quality_preference: Option<u32> = None, QualityPreference => "qualityPreference", eq equals;
    /// Preferred caption language, kept across sessions; `None` means off
    text_track_preference: Option<String> = None,
        TextTrackPreference => "textTrackPreference", eq equals;
    /// Seconds behind the live edge still considered "at" the edge
    live_edge_tolerance: f64 = DEFAULT_LIVE_EDGE_TOLERANCE,
        LiveEdgeTolerance => "liveEdgeTolerance", eq same_value;
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a subscription listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// Changes to a single field
    Key(StateKey),
    /// Any change, delivered once per batch
    Any,
}

impl From<StateKey> for Target {
    fn from(key: StateKey) -> Self {
        Target::Key(key)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Key(key) => write!(f, "{key}"),
            Target::Any => f.write_str("*"),
        }
    }
}
