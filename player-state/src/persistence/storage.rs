//! Key/value storage backends

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::StorageError;

/// A string key/value store
///
/// Methods take `&self`; backends shared between the store's hydration and
/// its [`StorageSync`](super::StorageSync) use interior mutability.
pub trait Storage {
    /// Read a value. A missing key is `Ok(None)`, not an error.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value. Removing a missing key succeeds.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

impl<S: Storage + ?Sized> Storage for Rc<S> {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove_item(key)
    }
}

/// In-memory storage
///
/// Can simulate the failure modes of browser-style storage: a byte quota
/// counted over keys and values, and being switched off entirely.
#[derive(Debug)]
pub struct MemoryStorage {
    items: RefCell<HashMap<String, String>>,
    quota: Option<usize>,
    available: Cell<bool>,
    writes: Cell<u64>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self {
            items: RefCell::new(HashMap::new()),
            quota: None,
            available: Cell::new(true),
            writes: Cell::new(0),
        }
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects writes once it would hold more than `bytes`
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            quota: Some(bytes),
            ..Self::default()
        }
    }

    /// Make every operation fail with [`StorageError::Unavailable`]
    pub fn set_available(&self, available: bool) {
        self.available.set(available);
    }

    /// Number of successful `set_item` calls
    pub fn write_count(&self) -> u64 {
        self.writes.get()
    }

    /// Store a value without quota checks or counting it as a write
    pub fn insert_raw(&self, key: impl Into<String>, value: impl Into<String>) {
        self.items.borrow_mut().insert(key.into(), value.into());
    }

    /// Current value of `key`, ignoring availability
    pub fn peek(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    fn used_bytes_with(&self, key: &str, value: &str) -> usize {
        self.items
            .borrow()
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum::<usize>()
            + key.len()
            + value.len()
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.available.get() {
            Ok(())
        } else {
            Err(StorageError::Unavailable)
        }
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check_available()?;
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_available()?;
        if let Some(quota) = self.quota {
            let needed = self.used_bytes_with(key, value);
            if needed > quota {
                return Err(StorageError::QuotaExceeded { needed, quota });
            }
        }
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.check_available()?;
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item("a").unwrap(), None);

        storage.set_item("a", "1").unwrap();
        assert_eq!(storage.get_item("a").unwrap().as_deref(), Some("1"));
        assert_eq!(storage.write_count(), 1);

        storage.remove_item("a").unwrap();
        storage.remove_item("a").unwrap();
        assert_eq!(storage.get_item("a").unwrap(), None);
    }

    #[test]
    fn test_quota_counts_replaced_value_once() {
        let storage = MemoryStorage::with_quota(8);
        storage.set_item("key", "12345").unwrap();
        // replacing the value does not double count the old one
        storage.set_item("key", "54321").unwrap();

        let err = storage.set_item("key", "123456").unwrap_err();
        assert!(matches!(
            err,
            StorageError::QuotaExceeded {
                needed: 9,
                quota: 8
            }
        ));
        assert_eq!(storage.peek("key").as_deref(), Some("54321"));
    }

    #[test]
    fn test_unavailable() {
        let storage = MemoryStorage::new();
        storage.insert_raw("a", "1");
        storage.set_available(false);

        assert!(matches!(storage.get_item("a"), Err(StorageError::Unavailable)));
        assert!(matches!(storage.set_item("a", "2"), Err(StorageError::Unavailable)));
        assert_eq!(storage.write_count(), 0);
    }
}
