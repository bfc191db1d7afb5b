//! File-backed storage: one JSON file per key.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use super::{Storage, StorageError};

/// Key-value store backed by a directory of JSON files.
///
/// Each key maps to `<dir>/<key>.json`. Writes replace the whole file, so a
/// committed value is never partially overwritten by a later failed write
/// of a *different* key. Read-modify-write steps are serialized across
/// clones of the same store.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    dir: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl JsonFileStorage {
    /// Create a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            lock: Arc::new(Mutex::new(())),
        })
    }

    /// Directory this store writes into.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for JsonFileStorage {
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn read(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<String>) -> Option<String>,
    ) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let current = fs::read_to_string(self.path_for(key)).ok();
        if let Some(next) = apply(current) {
            fs::write(self.path_for(key), next)?;
        }
        Ok(())
    }

    fn remove(&self, key: &str) {
        if let Err(err) = fs::remove_file(self.path_for(key))
            && err.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(key, error = %err, "failed to remove persisted value");
        }
    }
}
