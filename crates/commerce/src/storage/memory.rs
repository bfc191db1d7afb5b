//! In-memory storage for tests and diskless embedders.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::{Storage, StorageError};

/// Key-value store held entirely in memory.
///
/// Cheaply cloneable; clones share the same underlying map, so a store can
/// be handed to several components the way a single local storage instance
/// would be.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Storage for MemoryStorage {
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn read(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<String>) -> Option<String>,
    ) -> Result<(), StorageError> {
        // Write lock held across the whole read-modify-write step.
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(next) = apply(entries.get(key).cloned()) {
            entries.insert(key.to_owned(), next);
        }
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}
