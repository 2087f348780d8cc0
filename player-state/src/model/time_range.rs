//! Buffered and seekable time ranges

use serde::{Deserialize, Serialize};

/// A contiguous span of media time, in seconds
///
/// Range lists reported by the engine are ordered ascending and do not
/// overlap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Whether `time` falls inside the range (both ends inclusive)
    pub fn contains(&self, time: f64) -> bool {
        self.start <= time && time <= self.end
    }

    /// Length of the range in seconds
    pub fn len(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Whether the range spans no time
    pub fn is_empty(&self) -> bool {
        self.len() == 0.0
    }
}

impl From<(f64, f64)> for TimeRange {
    fn from((start, end): (f64, f64)) -> Self {
        Self::new(start, end)
    }
}
