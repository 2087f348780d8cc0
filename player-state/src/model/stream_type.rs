//! Stream classification, readiness and feature availability

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of stream being played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StreamType {
    /// On-demand media with a fixed duration
    #[default]
    #[serde(rename = "vod")]
    Vod,
    /// Live stream without seeking
    #[serde(rename = "live")]
    Live,
    /// Live stream that permits seeking back from the live edge
    #[serde(rename = "live:dvr")]
    LiveDvr,
}

impl StreamType {
    /// Parse the attribute form (`"vod"`, `"live"`, `"live:dvr"`)
    ///
    /// Unknown values fall back to `Vod`.
    pub fn from_attribute(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "live" => StreamType::Live,
            "live:dvr" | "ll-live:dvr" | "dvr" => StreamType::LiveDvr,
            _ => StreamType::Vod,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamType::Vod => "vod",
            StreamType::Live => "live",
            StreamType::LiveDvr => "live:dvr",
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Load readiness as reported by the playback engine
///
/// The store keeps this as `Option<Readiness>`; `None` means the engine has
/// not reported anything yet and is treated as loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Readiness {
    /// No source is attached
    Empty,
    /// A source is attached and data is being fetched
    Loading,
    /// Playback is blocked waiting for data
    Stalled,
    /// Enough data is available to play
    Ready,
}

/// Whether a platform feature can be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    /// The platform has no support for the feature
    #[default]
    Unsupported,
    /// Supported, but not usable right now
    Unavailable,
    /// Supported and usable
    Available,
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }
}

/// Features with a reported availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    Fullscreen,
    Pip,
    Volume,
}
