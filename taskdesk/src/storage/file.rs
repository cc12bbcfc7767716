//! File-backed storage: each key is a file inside a data directory.
//!
//! Writes go to a temporary sibling file which is then renamed over the
//! target, so a crash mid-write never leaves a half-written value behind.

use std::path::{Path, PathBuf};

use super::{KeyValueStorage, StorageError};

/// [`KeyValueStorage`] that keeps every key in `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Creates a storage rooted at `dir`. The directory is created lazily
    /// on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the data directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Maps a key to its file, rejecting keys that could escape the directory.
    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStorage for FileStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    async fn set_item(&self, key: &str, value: String) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StorageError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value.as_bytes())
            .await
            .map_err(|source| StorageError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(path = %path.display(), bytes = value.len(), "storage item written");
        Ok(())
    }
}
