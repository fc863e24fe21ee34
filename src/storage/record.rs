//! The persisted session: credential and identity as one value.
//!
//! Writing both under a single key means a login either lands completely or
//! not at all; there is no window where a token exists without its identity.

use serde::{Deserialize, Serialize};

use super::{Storage, StorageError, load_json, save_json};
use crate::net::types::Identity;

/// Storage key holding the JSON-encoded [`SessionRecord`].
pub const SESSION_KEY: &str = "session";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Opaque bearer token.
    pub token: String,
    pub user: Identity,
}

impl SessionRecord {
    /// Read the stored record.
    ///
    /// Absent, unreadable, or malformed data yields `None`, as does a record
    /// whose token is empty.
    pub fn load(storage: &dyn Storage) -> Option<Self> {
        let record: Self = load_json(storage, SESSION_KEY)?;
        if record.token.is_empty() {
            tracing::warn!("ignoring stored session with empty token");
            return None;
        }
        Some(record)
    }

    /// Persist this record, replacing any previous session.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn save(&self, storage: &dyn Storage) -> Result<(), StorageError> {
        save_json(storage, SESSION_KEY, self)
    }

    /// Remove the stored session.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn clear(storage: &dyn Storage) -> Result<(), StorageError> {
        storage.remove_item(SESSION_KEY)
    }
}
