//! In-process local store.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use super::{LocalStore, StorageError, announce};
use crate::events::EventBus;

/// A [`LocalStore`] that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
    bus: Option<EventBus>,
}

impl MemoryStore {
    /// Create an empty store that announces nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that announces writes on `bus`.
    #[must_use]
    pub fn with_events(bus: EventBus) -> Self {
        Self {
            entries: Mutex::default(),
            bus: Some(bus),
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries().insert(key.to_owned(), value.to_owned());
        announce(self.bus.as_ref(), key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let removed = self.entries().remove(key).is_some();
        if removed {
            announce(self.bus.as_ref(), key);
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let removed: Vec<String> = std::mem::take(&mut *self.entries()).into_keys().collect();
        for key in &removed {
            announce(self.bus.as_ref(), key);
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries().keys().cloned().collect()
    }
}
