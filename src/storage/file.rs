//! JSON-file-backed storage.
//!
//! All keys live in one JSON object file. Every mutation rewrites the whole
//! file through a uniquely named temp file in the same directory and a
//! rename, so a crash mid-write leaves either the old or the new contents on
//! disk, never a torn file.
//!
//! Read-modify-write cycles hold an exclusive lock on a sibling `.lock`
//! file. The lock is taken per open handle, so two `FileStorage` values on
//! one path (or two CLI processes) exclude each other and no update is lost.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::{Storage, StorageError};

type Items = BTreeMap<String, String>;

#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(ToOwned::to_owned).unwrap_or_default();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    /// Take the exclusive update lock. Released when the handle drops.
    fn lock_for_update(&self) -> Result<File, StorageError> {
        fs::create_dir_all(self.dir())?;
        let file = OpenOptions::new().create(true).truncate(false).write(true).open(self.lock_path())?;
        file.lock()?;
        Ok(file)
    }

    fn read_all(&self) -> Result<Items, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(Items::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Items::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Like [`Self::read_all`], but a corrupt file is discarded so writes
    /// (and in particular logout) can still make progress.
    fn read_for_update(&self) -> Result<Items, StorageError> {
        match self.read_all() {
            Err(StorageError::Serialize(e)) => {
                tracing::warn!(path = %self.path.display(), error = %e, "discarding corrupt storage file");
                Ok(Items::new())
            }
            other => other,
        }
    }

    fn write_all(&self, items: &Items) -> Result<(), StorageError> {
        let raw = serde_json::to_string_pretty(items)?;
        let mut tmp = NamedTempFile::new_in(self.dir())?;
        tmp.write_all(raw.as_bytes())?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        // Writers replace the file by rename, so a plain read never sees a
        // partial write.
        let mut items = self.read_all()?;
        Ok(items.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _lock = self.lock_for_update()?;
        let mut items = self.read_for_update()?;
        items.insert(key.to_owned(), value.to_owned());
        self.write_all(&items)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        if !self.path.exists() {
            return Ok(());
        }
        let _lock = self.lock_for_update()?;
        let mut items = self.read_for_update()?;
        items.remove(key);
        self.write_all(&items)
    }
}
