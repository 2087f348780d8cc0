//! Configuration types for player-state
//!
//! This module defines the structures that control the store's error
//! reporting and the persistence layer's namespace, whitelist and write
//! cadence.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use tracing::error;

use crate::error::SubscriberError;
use crate::persistence::PersistKey;

/// Namespace used when none is configured
pub const DEFAULT_NAMESPACE: &str = "playerkit";

/// Receives failures of subscriber callbacks
pub type ErrorSink = Rc<dyn Fn(&SubscriberError)>;

/// The default sink: log at error level
pub fn log_subscriber_error(err: &SubscriberError) {
    error!(error = %err, "Subscriber failed during notification");
}

/// Configuration for the StateStore
#[derive(Clone)]
pub struct StoreConfig {
    /// Where subscriber failures are reported
    /// Default: logs through `tracing::error!`
    pub error_sink: ErrorSink,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            error_sink: Rc::new(log_subscriber_error),
        }
    }
}

impl StoreConfig {
    /// Create a StoreConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Report subscriber failures to `sink`
    pub fn with_error_sink(mut self, sink: impl Fn(&SubscriberError) + 'static) -> Self {
        self.error_sink = Rc::new(sink);
        self
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig").finish_non_exhaustive()
    }
}

/// Configuration for persisting a whitelisted slice of state
#[derive(Debug, Clone, PartialEq)]
pub struct PersistenceConfig {
    /// Storage key of the persisted record
    /// Default: "playerkit"
    pub namespace: String,

    /// Fields written to storage
    /// Default: every `PersistKey`
    pub keys: Vec<PersistKey>,

    /// Quiet period after the last change before writing
    /// Default: 250 milliseconds
    pub debounce: Duration,

    /// Longest a stream of changes can postpone a write
    /// Default: 1 second
    pub max_wait: Option<Duration>,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            keys: PersistKey::ALL.to_vec(),
            debounce: Duration::from_millis(250),
            max_wait: Some(Duration::from_secs(1)),
        }
    }
}

impl PersistenceConfig {
    /// Create a PersistenceConfig for `namespace` with default values
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Persist only the audio settings (volume, mute)
    pub fn audio_only(namespace: impl Into<String>) -> Self {
        Self {
            keys: vec![PersistKey::Volume, PersistKey::Muted],
            ..Self::new(namespace)
        }
    }

    pub fn with_keys(mut self, keys: impl IntoIterator<Item = PersistKey>) -> Self {
        self.keys = keys.into_iter().collect();
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// `None` disables the ceiling: writes wait until changes settle
    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_defaults() {
        let config = PersistenceConfig::default();
        assert_eq!(config.namespace, DEFAULT_NAMESPACE);
        assert_eq!(config.keys.len(), PersistKey::ALL.len());
        assert_eq!(config.debounce, Duration::from_millis(250));
        assert_eq!(config.max_wait, Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_audio_only_preset() {
        let config = PersistenceConfig::audio_only("my-app");
        assert_eq!(config.namespace, "my-app");
        assert_eq!(config.keys, vec![PersistKey::Volume, PersistKey::Muted]);
    }

    #[test]
    fn test_custom_error_sink() {
        let hits = Rc::new(std::cell::Cell::new(0));
        let config = {
            let hits = Rc::clone(&hits);
            StoreConfig::new().with_error_sink(move |_| hits.set(hits.get() + 1))
        };
        (config.error_sink)(&SubscriberError::Panicked {
            id: 1,
            target: crate::model::Target::Any,
            message: String::new(),
        });
        assert_eq!(hits.get(), 1);
    }
}
