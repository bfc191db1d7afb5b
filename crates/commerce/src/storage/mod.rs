//! Durable key-value persistence.
//!
//! The storefront client survives restarts by serializing its state to a
//! small key-value store: one JSON document per key. The file-backed
//! implementation is the desktop/dev equivalent of the browser's local
//! storage; the in-memory implementation backs tests and embedders without
//! a writable disk.
//!
//! Reads are corruption-tolerant by contract: a missing or unparsable value
//! is reported as absent (and logged), never as an error. A user should not
//! be locked out of the store because a cart file was truncated.

mod json_file;
mod memory;

pub use json_file::JsonFileStorage;
pub use memory::MemoryStorage;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Keys under which client state is persisted.
pub mod keys {
    /// Bearer token for the current session.
    pub const TOKEN: &str = "token";

    /// Cart line items.
    pub const CART: &str = "cart";

    /// Append-only order history.
    pub const ORDERS: &str = "orders";
}

/// Errors that can occur when writing to the store.
///
/// Reads never produce errors; see the module docs.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Value could not be serialized to JSON.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Underlying store rejected the write.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A durable string key-value store.
///
/// Implementations persist raw JSON text; [`StorageExt`] layers the typed
/// serialize/deserialize contract on top.
pub trait Storage: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the underlying store rejects the write.
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Read the raw value under `key`, or `None` if absent.
    fn read(&self, key: &str) -> Option<String>;

    /// Atomically replace the value under `key`.
    ///
    /// `apply` receives the current raw value and returns the replacement;
    /// returning `None` leaves the stored value untouched. The whole
    /// read-modify-write step is serialized against every other write to
    /// this store, so two concurrent updates of the same key cannot lose
    /// each other's changes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the underlying store rejects the write.
    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<String>) -> Option<String>,
    ) -> Result<(), StorageError>;

    /// Remove the value under `key`. Removing an absent key is a no-op.
    fn remove(&self, key: &str);
}

/// Typed save/load on top of any [`Storage`].
pub trait StorageExt: Storage {
    /// Serialize `value` to JSON and store it under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if serialization or the write fails.
    fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string(value)?;
        self.write(key, &json)
    }

    /// Load and deserialize the value under `key`.
    ///
    /// Returns `None` for both absent and corrupt values; corruption is
    /// logged and the stored value is treated as if it never existed.
    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.read(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key, error = %err, "discarding corrupt persisted value");
                None
            }
        }
    }

    /// Atomically load, mutate, and save the value under `key`.
    ///
    /// An absent or corrupt stored value starts from `T::default()`, with
    /// corruption logged as in [`load`](Self::load). The step is serialized
    /// per the [`Storage::update`] contract.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if serialization or the write fails; the
    /// stored value is left untouched in that case.
    fn modify<T>(&self, key: &str, mut apply: impl FnMut(&mut T)) -> Result<(), StorageError>
    where
        T: Serialize + DeserializeOwned + Default,
    {
        let mut result = Ok(());
        self.update(key, &mut |raw| {
            let mut value = raw
                .and_then(|raw| match serde_json::from_str::<T>(&raw) {
                    Ok(value) => Some(value),
                    Err(err) => {
                        tracing::warn!(key, error = %err, "discarding corrupt persisted value");
                        None
                    }
                })
                .unwrap_or_default();
            apply(&mut value);
            match serde_json::to_string(&value) {
                Ok(json) => Some(json),
                Err(err) => {
                    result = Err(StorageError::Serialize(err));
                    None
                }
            }
        })?;
        result
    }
}

impl<S: Storage + ?Sized> StorageExt for S {}
