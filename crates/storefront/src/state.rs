//! Shared client state handed to every command.

use std::sync::Arc;

use crate::api::{ApiClient, ApiError};
use crate::config::ClientConfig;
use crate::events::EventBus;
use crate::selection::SelectionStore;
use crate::session::Session;
use crate::storage::{FileStore, LocalStore};

/// Everything a storefront surface needs, wired once at startup.
///
/// This struct is cheaply cloneable via `Arc`. Every clone shares the same
/// local store, event bus and API connection pool.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ClientConfig,
    api: ApiClient,
    store: Arc<dyn LocalStore>,
    bus: EventBus,
    session: Session,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .field("api", &self.inner.api)
            .field("session", &self.inner.session)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Wire state over the file store named in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let bus = EventBus::new();
        let store: Arc<dyn LocalStore> =
            Arc::new(FileStore::open(&config.storage_path).with_events(bus.clone()));
        Self::with_store(config, store, bus)
    }

    /// Wire state over an existing store and bus.
    ///
    /// # Errors
    ///
    /// Returns an error if the API client cannot be built.
    pub fn with_store(
        config: ClientConfig,
        store: Arc<dyn LocalStore>,
        bus: EventBus,
    ) -> Result<Self, ApiError> {
        let api = ApiClient::new(&config.api)?;
        let session = Session::load(store.clone(), bus.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                store,
                bus,
                session,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn LocalStore> {
        &self.inner.store
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// A fresh selection store over this state's session and API.
    ///
    /// Each surface gets its own; they stay in step through the bus.
    #[must_use]
    pub fn selections(&self) -> SelectionStore {
        SelectionStore::new(
            self.inner.store.clone(),
            self.inner.session.clone(),
            Arc::new(self.inner.api.clone()),
            self.inner.bus.clone(),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;

    use super::*;
    use crate::config::ApiConfig;
    use crate::storage::MemoryStore;

    fn config() -> ClientConfig {
        ClientConfig {
            api: ApiConfig::new(Url::parse("http://127.0.0.1:9").unwrap()),
            storage_path: "unused.json".into(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    #[test]
    fn test_clones_share_store() {
        let bus = EventBus::new();
        let state = AppState::with_store(config(), Arc::new(MemoryStore::new()), bus).unwrap();
        let other = state.clone();

        state.store().set("userToken", "tok").unwrap();
        assert!(other.session().is_authenticated());
        assert!(other.selections().session().is_authenticated());
    }
}
