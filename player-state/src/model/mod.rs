//! Model types for player-state

mod media_error;
mod player_state;
mod stream_type;
mod time_range;
mod tracks;

pub use media_error::{MediaError, MediaErrorCode};
pub(crate) use player_state::FieldSignals;
pub use player_state::{PlayerState, StateKey, Target, DEFAULT_LIVE_EDGE_TOLERANCE};
pub use stream_type::{Availability, Feature, Readiness, StreamType};
pub use time_range::TimeRange;
pub use tracks::{AudioTrack, Quality, TextTrack, TextTrackKind, TextTrackMode};
