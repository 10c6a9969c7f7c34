//! Durable local key-value storage.
//!
//! Holds the anonymous cart and wishlist plus the cached session profile,
//! as plain strings with no schema versioning and no encryption. Two
//! backends are provided:
//!
//! - [`FileStore`] - a JSON object on disk, surviving restarts
//! - [`MemoryStore`] - in-process only, for tests and throwaway sessions
//!
//! Both announce every write as [`StoreEvent::StorageChanged`] when given an
//! [`EventBus`], which is how other surfaces sharing the store notice
//! changes they did not make.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use marigold_core::ProductId;
use thiserror::Error;

use crate::events::{EventBus, StoreEvent};

/// Well-known storage keys.
pub mod keys {
    pub const USER_TOKEN: &str = "userToken";
    pub const USER_NAME: &str = "userName";
    pub const USER_ROLE: &str = "userRole";
    pub const USER_ID: &str = "userId";
    pub const USER_EMAIL: &str = "userEmail";
    pub const USER_PHONE: &str = "userPhone";
    pub const USER_AGE: &str = "userAge";
    pub const USER_PHOTO: &str = "userPhoto";
    pub const CART: &str = "cart";
    pub const WISHLIST: &str = "wishlist";

    /// Keys written on login and signup.
    pub const PROFILE: [&str; 8] = [
        USER_TOKEN, USER_NAME, USER_ROLE, USER_ID, USER_EMAIL, USER_PHONE, USER_AGE, USER_PHOTO,
    ];
}

/// Errors from the local durable store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding the store contents failed.
    #[error("storage encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A string key-value store scoped to this client.
///
/// Reads never fail: unreadable state is treated as absent.
pub trait LocalStore: Send + Sync {
    /// Value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot persist the change.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key` if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot persist the change.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Remove every key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot persist the change.
    fn clear(&self) -> Result<(), StorageError>;

    /// All keys currently stored, sorted.
    fn keys(&self) -> Vec<String>;
}

/// Read an anonymous selection list.
///
/// Anything that is not a JSON array reads as empty. Within an array,
/// integers and numeric strings are accepted and everything else is skipped.
/// Duplicates keep their first position.
#[must_use]
pub fn read_id_list(store: &dyn LocalStore, key: &str) -> Vec<ProductId> {
    let Some(raw) = store.get(key) else {
        return Vec::new();
    };

    let items = match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(serde_json::Value::Array(items)) => items,
        Ok(_) | Err(_) => {
            tracing::debug!(key, "Ignoring malformed selection list in local storage");
            return Vec::new();
        }
    };

    let mut ids: Vec<ProductId> = Vec::with_capacity(items.len());
    for item in items {
        let id = match item {
            serde_json::Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
            serde_json::Value::String(s) => s.trim().parse::<i32>().ok(),
            _ => None,
        };
        if let Some(id) = id.map(ProductId::new)
            && !ids.contains(&id)
        {
            ids.push(id);
        }
    }
    ids
}

/// Persist an anonymous selection list as a JSON array of ids.
///
/// # Errors
///
/// Returns an error if encoding or the store write fails.
pub fn write_id_list(
    store: &dyn LocalStore,
    key: &str,
    ids: &[ProductId],
) -> Result<(), StorageError> {
    let encoded = serde_json::to_string(ids)?;
    store.set(key, &encoded)
}

/// Publish a storage change if a bus is attached.
fn announce(bus: Option<&EventBus>, key: &str) {
    if let Some(bus) = bus {
        bus.publish(StoreEvent::StorageChanged {
            key: key.to_owned(),
        });
    }
}
