//! In-memory storage backend with an optional byte quota.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{StorageBackend, StorageError};

/// `localStorage` stand-in held in process memory.
///
/// When a quota is set, a write that would push the total stored value
/// size past it fails with [`StorageError::QuotaExceeded`] and leaves the
/// previous value in place.
#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_quota(quota: usize) -> Self {
        Self { items: Mutex::new(HashMap::new()), quota: Some(quota) }
    }

    /// Seed a raw value without going through a `KvStore`.
    pub fn insert_raw(&self, key: &str, raw: &str) {
        self.lock().insert(key.to_owned(), raw.to_owned());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.items.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl StorageBackend for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.lock();
        if let Some(quota) = self.quota {
            let others: usize = items.iter().filter(|(k, _)| k.as_str() != key).map(|(_, v)| v.len()).sum();
            let total = others + value.len();
            if total > quota {
                return Err(StorageError::QuotaExceeded { key: key.to_owned(), bytes: total - quota, quota });
            }
        }
        items.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
