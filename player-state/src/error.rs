//! Error types for player-state
//!
//! Nothing in this crate surfaces these errors to the UI. Persistence
//! failures degrade to "no persisted state" and subscriber failures are
//! reported to the store's error sink.

use crate::model::Target;

/// Result type for fallible persistence operations
pub type Result<T> = std::result::Result<T, PersistError>;

/// Failures of a storage backend
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Storage cannot be used at all (disabled, private mode, no data dir)
    #[error("storage is unavailable")]
    Unavailable,

    /// A write would exceed the backend's quota
    #[error("storage quota exceeded: {needed} bytes needed, quota is {quota}")]
    QuotaExceeded {
        /// Bytes the store would hold after the write
        needed: usize,
        /// Maximum bytes allowed
        quota: usize,
    },

    /// Underlying I/O failure
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a persisted record could not be read or written
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("malformed persisted record: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("persisted record has version {found}, expected {expected}")]
    VersionMismatch { found: u32, expected: u32 },
}

/// A subscriber callback failed while being notified
#[derive(Debug, Clone, thiserror::Error)]
pub enum SubscriberError {
    #[error("subscriber {id} on {target} panicked: {message}")]
    Panicked {
        /// Subscription id
        id: u64,
        /// What the subscriber listened to
        target: Target,
        /// Panic payload, if it was a string
        message: String,
    },
}
