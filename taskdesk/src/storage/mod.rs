//! Local key-value storage backing the simulated task API.
//!
//! Defines the [`KeyValueStorage`] trait, a string-to-string store with the
//! same shape as browser `localStorage`, plus two implementations:
//! - [`MemoryStorage`]: in-process map with an optional size quota
//! - [`file::FileStorage`]: one file per key inside a data directory
//!
//! Storage never interprets values; the repository owns the JSON format.

pub mod file;

use std::collections::HashMap;
use std::path::PathBuf;

use tokio::sync::Mutex;

pub use file::FileStorage;

/// Errors raised by a storage backend.
///
/// These are the "unexpected" failures of the task API: they are not
/// part of the simulated fault model and surface to the user as a
/// generic connection error.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Writing the value would exceed the storage quota.
    #[error("storage quota exceeded writing {key}: {needed} bytes, limit {limit}")]
    QuotaExceeded {
        /// Key being written.
        key: String,
        /// Total bytes the store would hold after the write.
        needed: usize,
        /// Configured limit in bytes.
        limit: usize,
    },

    /// The key cannot be used by this backend.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    /// An I/O operation on the backing file failed.
    #[error("storage I/O error on {path}: {source}")]
    Io {
        /// File that was accessed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The backend is not available at all.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Async string key-value store.
///
/// Every call is a suspension point; callers must not assume that a read
/// followed by a write happens without other operations in between.
pub trait KeyValueStorage: Send + Sync {
    /// Returns the value stored under `key`, or `None` if absent.
    fn get_item(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Stores `value` under `key`, replacing any previous value.
    fn set_item(
        &self,
        key: &str,
        value: String,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;
}

impl<S: KeyValueStorage> KeyValueStorage for std::sync::Arc<S> {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.as_ref().get_item(key).await
    }

    async fn set_item(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.as_ref().set_item(key, value).await
    }
}

/// In-memory implementation of [`KeyValueStorage`].
///
/// Data lives as long as the value. An optional quota caps the total size
/// of keys plus values, mimicking the browser's storage limit.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    /// Create a new, empty store without a quota.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new, empty store holding at most `bytes` of keys and values.
    #[must_use]
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            quota: Some(bytes),
        }
    }

    /// Create a store pre-populated with one entry.
    #[must_use]
    pub fn with_item(key: &str, value: impl Into<String>) -> Self {
        let mut items = HashMap::new();
        items.insert(key.to_string(), value.into());
        Self {
            items: Mutex::new(items),
            quota: None,
        }
    }
}

impl KeyValueStorage for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.lock().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut items = self.items.lock().await;
        if let Some(limit) = self.quota {
            let others: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > limit {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    limit,
                });
            }
        }
        items.insert(key.to_string(), value);
        Ok(())
    }
}
