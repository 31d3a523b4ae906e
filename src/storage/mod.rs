//! Persistent key-value store adapter.
//!
//! DESIGN
//! ======
//! `KvStore` wraps a raw string backend (`StorageBackend`) with JSON
//! encode/decode and a single publish/subscribe channel for change
//! notifications. Local writes and changes injected from another process
//! (the "other tab") travel on the same `tokio::sync::broadcast` channel,
//! tagged with a [`ChangeOrigin`], so every consumer in the process sees
//! updates without holding a reference to the writer.
//!
//! ERROR HANDLING
//! ==============
//! Reads never fail: unparseable or unreadable values are logged and
//! treated as absent. Writes log a warning on failure and leave the prior
//! stored value untouched. The `Result` returned from `write` exists only so
//! optimistic callers can roll back; best-effort callers drop it.

pub mod file;
pub mod memory;

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::{ErrorCode, ErrorKind};

pub use file::FileStorage;
pub use memory::MemoryStorage;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// The backend refused the write because it would exceed its quota.
    #[error("storage quota exceeded writing {key} ({bytes} bytes over {quota})")]
    QuotaExceeded { key: String, bytes: usize, quota: usize },

    /// The backend failed to read or write.
    #[error("storage I/O failed for {key}: {message}")]
    Io { key: String, message: String },

    /// The value could not be serialized to JSON.
    #[error("storage encode failed for {key}: {message}")]
    Encode { key: String, message: String },
}

impl ErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::QuotaExceeded { .. } => "E_STORAGE_QUOTA",
            Self::Io { .. } => "E_STORAGE_IO",
            Self::Encode { .. } => "E_STORAGE_ENCODE",
        }
    }

    fn kind(&self) -> ErrorKind {
        ErrorKind::Storage
    }
}

// =============================================================================
// BACKEND
// =============================================================================

/// Raw string storage, the shape of the browser's `localStorage`.
pub trait StorageBackend: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// # Errors
    ///
    /// Returns a [`StorageError`] if the value cannot be stored.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns a [`StorageError`] if the key cannot be removed.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

// =============================================================================
// CHANGE NOTIFICATIONS
// =============================================================================

/// Where a change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// A write made through this `KvStore` (same page).
    Local,
    /// A write made elsewhere and reported via [`KvStore::notify_external`].
    External,
}

/// A single key change. `value` is `None` when the key was removed.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageChange {
    pub key: String,
    pub value: Option<serde_json::Value>,
    pub origin: ChangeOrigin,
}

impl StorageChange {
    /// Decode the new value, logging and discarding it if it has the wrong shape.
    pub fn decode<T: DeserializeOwned>(&self) -> Option<T> {
        let value = self.value.clone()?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(key = %self.key, error = %e, "storage change has unexpected shape");
                None
            }
        }
    }
}

// =============================================================================
// KV STORE
// =============================================================================

/// JSON key-value store with change notifications. Cheap to clone; all
/// clones share the backend and the notification channel.
#[derive(Clone)]
pub struct KvStore {
    backend: Arc<dyn StorageBackend>,
    changes: broadcast::Sender<StorageChange>,
}

impl KvStore {
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { backend, changes }
    }

    /// Store backed by a fresh, unbounded [`MemoryStorage`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Read and decode `key`. Missing, unreadable, and unparseable values
    /// all come back as `None`.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get_item(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(%key, error = %e, "storage read failed");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(%key, error = %e, "stored value is not valid JSON, treating as absent");
                None
            }
        }
    }

    /// Encode and store `value`, then notify subscribers.
    ///
    /// # Errors
    ///
    /// Returns the [`StorageError`] after logging it. The previously stored
    /// value is left in place and no notification is sent.
    pub fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let encoded = serde_json::to_value(value)
            .map_err(|e| StorageError::Encode { key: key.to_owned(), message: e.to_string() })
            .inspect_err(|e| warn!(%key, error = %e, "storage encode failed"))?;
        let raw = encoded.to_string();

        self.backend
            .set_item(key, &raw)
            .inspect_err(|e| warn!(%key, error = %e, "storage write failed"))?;

        debug!(%key, bytes = raw.len(), "storage write");
        self.publish(StorageChange { key: key.to_owned(), value: Some(encoded), origin: ChangeOrigin::Local });
        Ok(())
    }

    /// Remove `key` and notify subscribers.
    ///
    /// # Errors
    ///
    /// Returns the [`StorageError`] after logging it.
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.backend
            .remove_item(key)
            .inspect_err(|e| warn!(%key, error = %e, "storage remove failed"))?;
        self.publish(StorageChange { key: key.to_owned(), value: None, origin: ChangeOrigin::Local });
        Ok(())
    }

    /// Subscribe to every change published after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }

    /// Report a change made outside this process. `raw` is the new stored
    /// JSON text, or `None` if the key was removed. Unparseable payloads are
    /// logged and dropped.
    pub fn notify_external(&self, key: &str, raw: Option<&str>) {
        let value = match raw.map(serde_json::from_str::<serde_json::Value>) {
            None => None,
            Some(Ok(v)) => Some(v),
            Some(Err(e)) => {
                warn!(%key, error = %e, "failed to parse external storage change");
                return;
            }
        };
        self.publish(StorageChange { key: key.to_owned(), value, origin: ChangeOrigin::External });
    }

    fn publish(&self, change: StorageChange) {
        // No receivers is fine: nobody is listening yet.
        let _ = self.changes.send(change);
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
