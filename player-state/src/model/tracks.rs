//! Renditions and tracks: video qualities, text tracks and audio tracks

use serde::{Deserialize, Serialize};

/// One video rendition offered by the engine
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quality {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub bitrate: u64,
    pub codec: Option<String>,
    pub selected: bool,
}

impl Quality {
    /// A quality identified by its height, e.g. `Quality::new(720)`
    pub fn new(height: u32) -> Self {
        Self {
            id: format!("{height}p"),
            height,
            ..Default::default()
        }
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn with_bitrate(mut self, bitrate: u64) -> Self {
        self.bitrate = bitrate;
        self
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }
}

/// Kind of a text track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextTrackKind {
    Subtitles,
    Captions,
    Descriptions,
    Chapters,
    Metadata,
}

impl TextTrackKind {
    /// Whether two kinds are mutually exclusive when showing
    ///
    /// Captions and subtitles share one group; every other kind is its own
    /// group.
    pub fn shares_group(self, other: TextTrackKind) -> bool {
        (self.is_caption_like() && other.is_caption_like()) || self == other
    }

    /// Captions or subtitles
    pub fn is_caption_like(self) -> bool {
        matches!(self, TextTrackKind::Captions | TextTrackKind::Subtitles)
    }
}

/// Display mode of a text track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextTrackMode {
    #[default]
    Disabled,
    Hidden,
    Showing,
}

/// A text track (captions, subtitles, chapters, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextTrack {
    pub id: String,
    pub kind: TextTrackKind,
    pub label: String,
    pub language: String,
    pub mode: TextTrackMode,
}

impl TextTrack {
    pub fn new(id: impl Into<String>, kind: TextTrackKind, language: impl Into<String>) -> Self {
        let language = language.into();
        Self {
            id: id.into(),
            kind,
            label: language.clone(),
            language,
            mode: TextTrackMode::Disabled,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_mode(mut self, mode: TextTrackMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn is_showing(&self) -> bool {
        self.mode == TextTrackMode::Showing
    }
}

/// An audio track (language or commentary variant)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioTrack {
    pub id: String,
    pub label: String,
    pub language: String,
    pub enabled: bool,
}

impl AudioTrack {
    pub fn new(id: impl Into<String>, language: impl Into<String>) -> Self {
        let language = language.into();
        Self {
            id: id.into(),
            label: language.clone(),
            language,
            enabled: false,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}
