//! Durable key/value storage for session data.
//!
//! SYSTEM CONTEXT
//! ==============
//! Plays the part browser `localStorage` plays for a web front end: string
//! values under well-known keys, read and written synchronously. The session
//! store and the API client share one instance, so a credential written by
//! one is visible to the other on the next call.


mod file;
mod memory;
mod record;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use record::{SESSION_KEY, SessionRecord};

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Error returned by [`Storage`] implementations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backing medium could not be read or written.
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),
    /// A value could not be encoded, or the backing file is not valid JSON.
    #[error("storage data is not valid JSON: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Synchronous string key/value store.
///
/// Each call is atomic on its own; there are no multi-key transactions.
pub trait Storage: Send + Sync {
    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be written.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be written.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Load a JSON value stored under `key`.
///
/// Best effort: read failures and malformed data are logged and reported as
/// `None` so callers fall back to their empty state.
pub fn load_json<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Option<T> {
    let raw = match storage.get_item(key) {
        Ok(raw) => raw?,
        Err(e) => {
            tracing::warn!(key, error = %e, "storage read failed");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, error = %e, "ignoring malformed stored value");
            None
        }
    }
}

/// Save `value` as JSON under `key`.
///
/// # Errors
///
/// Returns an error if the value cannot be encoded or the write fails.
pub fn save_json<T: Serialize>(storage: &dyn Storage, key: &str, value: &T) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value)?;
    storage.set_item(key, &raw)
}
