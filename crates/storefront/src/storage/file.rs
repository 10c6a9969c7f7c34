//! JSON-file-backed local store.
//!
//! The whole store is one JSON object. Every operation re-reads the file so
//! that separate processes sharing it see each other's writes; the last
//! writer wins. Writes go to a sibling temp file first and are renamed into
//! place.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::{LocalStore, StorageError, announce};
use crate::events::EventBus;

type Entries = BTreeMap<String, String>;

/// A [`LocalStore`] persisted to a JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
    bus: Option<EventBus>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`.
    ///
    /// The file is not touched until the first write.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
            bus: None,
        }
    }

    /// Announce writes on `bus`.
    #[must_use]
    pub fn with_events(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the current contents, treating a missing or corrupt file as empty.
    fn load(&self) -> Entries {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Entries::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read local store");
                return Entries::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "Local store is corrupt, starting empty");
            Entries::new()
        })
    }

    fn save(&self, entries: &Entries) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let encoded = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, encoded)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn modify<R>(&self, f: impl FnOnce(&mut Entries) -> R) -> Result<R, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.load();
        let result = f(&mut entries);
        self.save(&entries)?;
        Ok(result)
    }
}

impl LocalStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.load().remove(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.modify(|entries| {
            entries.insert(key.to_owned(), value.to_owned());
        })?;
        announce(self.bus.as_ref(), key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let removed = self.modify(|entries| entries.remove(key).is_some())?;
        if removed {
            announce(self.bus.as_ref(), key);
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let removed = self.modify(|entries| std::mem::take(entries).into_keys().collect::<Vec<_>>())?;
        for key in &removed {
            announce(self.bus.as_ref(), key);
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.load().into_keys().collect()
    }
}
