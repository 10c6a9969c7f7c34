//! Cart and wishlist membership over local or remote storage.
//!
//! # Architecture
//!
//! - Anonymous shoppers keep each set as a JSON id list in the local store
//! - Logged-in shoppers keep them on the API; the local lists are left alone
//!   and are not merged in on login
//! - The backing store is chosen per call from the current session, so a
//!   login or logout takes effect on the next operation
//! - Remote mutations are request, confirm, then update: a failed call
//!   changes nothing locally and publishes nothing
//! - A remote set is fetched before its first mutation, so membership is
//!   never decided against a list that was not loaded
//!
//! Every successful mutation publishes [`StoreEvent::SelectionChanged`] so
//! other surfaces (see [`SelectionBadge`]) can re-read their own state.

mod badge;
mod summary;

pub use badge::SelectionBadge;
pub use summary::{CartSummary, adjust_quantity, fill_snapshots};

use std::collections::HashMap;
use std::sync::Arc;

use marigold_core::{Membership, ProductId, SelectionKind, UserId};
use thiserror::Error;
use tracing::instrument;

use crate::api::{ApiError, RemoteSelections, SelectionEntry};
use crate::error::add_breadcrumb;
use crate::events::{EventBus, StoreEvent};
use crate::session::{Credentials, Session};
use crate::storage::{LocalStore, StorageError, read_id_list, write_id_list};

/// Errors from selection operations.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// Loading the set from the API failed.
    #[error("failed to fetch {kind}: {source}")]
    FetchFailed {
        kind: SelectionKind,
        #[source]
        source: ApiError,
    },

    /// The API rejected an add or remove, or could not be reached.
    #[error("failed to update {kind}: {source}")]
    UpdateFailed {
        kind: SelectionKind,
        #[source]
        source: ApiError,
    },

    /// The anonymous list could not be persisted.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SelectionError {
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Message suitable for a transient notice.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::FetchFailed { kind, .. } => {
                format!("Error fetching {}. Please try again.", kind.label())
            }
            Self::UpdateFailed { source, .. } => source.user_message(),
            Self::Storage(_) => "Something went wrong.".to_string(),
        }
    }
}

/// Whose selections a loaded list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Identity {
    Anonymous,
    User(Option<UserId>),
}

#[derive(Debug, Clone)]
struct Loaded {
    identity: Identity,
    entries: Vec<SelectionEntry>,
}

/// Add, remove, toggle and list over the store the session selects.
#[derive(Clone)]
pub struct SelectionStore {
    store: Arc<dyn LocalStore>,
    session: Session,
    remote: Arc<dyn RemoteSelections>,
    bus: EventBus,
    loaded: HashMap<SelectionKind, Loaded>,
}

impl std::fmt::Debug for SelectionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionStore")
            .field("session", &self.session)
            .field("loaded", &self.loaded)
            .finish_non_exhaustive()
    }
}

impl SelectionStore {
    #[must_use]
    pub fn new(
        store: Arc<dyn LocalStore>,
        session: Session,
        remote: Arc<dyn RemoteSelections>,
        bus: EventBus,
    ) -> Self {
        Self {
            store,
            session,
            remote,
            bus,
            loaded: HashMap::new(),
        }
    }

    /// The session deciding which store is used.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// A new receiver on the bus this store publishes to.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<StoreEvent> {
        self.bus.subscribe()
    }

    fn identity(credentials: Option<&Credentials>) -> Identity {
        credentials.map_or(Identity::Anonymous, |c| Identity::User(c.user_id))
    }

    /// Most recently loaded entries for the current identity.
    fn loaded(&self, kind: SelectionKind) -> Option<&[SelectionEntry]> {
        let identity = Self::identity(self.session.credentials().as_ref());
        self.loaded
            .get(&kind)
            .filter(|loaded| loaded.identity == identity)
            .map(|loaded| loaded.entries.as_slice())
    }

    fn set_loaded(&mut self, kind: SelectionKind, identity: Identity, entries: Vec<SelectionEntry>) {
        self.loaded.insert(kind, Loaded { identity, entries });
    }

    /// Current members of the set.
    ///
    /// The result becomes the membership [`contains`](Self::contains)
    /// answers from. A failed fetch leaves the previous membership in place.
    ///
    /// # Errors
    ///
    /// Returns `SelectionError::FetchFailed` if the API read fails.
    #[instrument(skip(self))]
    pub async fn list(&mut self, kind: SelectionKind) -> Result<Vec<SelectionEntry>, SelectionError> {
        let credentials = self.session.credentials();
        let identity = Self::identity(credentials.as_ref());

        let entries = match &credentials {
            Some(credentials) => self
                .remote
                .fetch(kind, &credentials.token)
                .await
                .map_err(|source| {
                    tracing::warn!(%kind, error = %source, "Failed to fetch selections");
                    SelectionError::FetchFailed { kind, source }
                })?,
            None => read_id_list(self.store.as_ref(), kind.storage_key())
                .into_iter()
                .map(SelectionEntry::bare)
                .collect(),
        };

        self.set_loaded(kind, identity, entries.clone());
        Ok(entries)
    }

    /// Whether `product_id` was in the set when it was last loaded.
    #[must_use]
    pub fn contains(&self, kind: SelectionKind, product_id: ProductId) -> bool {
        self.loaded(kind)
            .is_some_and(|entries| entries.iter().any(|e| e.product_id == product_id))
    }

    /// Entries from the last load, without fetching.
    #[must_use]
    pub fn entries(&self, kind: SelectionKind) -> Vec<SelectionEntry> {
        self.loaded(kind).map(<[SelectionEntry]>::to_vec).unwrap_or_default()
    }

    /// Add a product to the set. Adding a present product does nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the set cannot be loaded, the API write fails or
    /// the local list cannot be saved. Nothing changes in that case.
    #[instrument(skip(self))]
    pub async fn add(&mut self, kind: SelectionKind, product_id: ProductId) -> Result<(), SelectionError> {
        self.apply(kind, product_id, Membership::Present).await
    }

    /// Remove a product from the set. Removing an absent product does nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the set cannot be loaded, the API write fails or
    /// the local list cannot be saved. Nothing changes in that case.
    #[instrument(skip(self))]
    pub async fn remove(&mut self, kind: SelectionKind, product_id: ProductId) -> Result<(), SelectionError> {
        self.apply(kind, product_id, Membership::Absent).await
    }

    /// Remove the product if present, otherwise add it.
    ///
    /// # Errors
    ///
    /// Returns `SelectionError::FetchFailed` if a logged-in set is not loaded
    /// and cannot be fetched, or an error from the underlying add or remove.
    #[instrument(skip(self))]
    pub async fn toggle(
        &mut self,
        kind: SelectionKind,
        product_id: ProductId,
    ) -> Result<Membership, SelectionError> {
        let present = if self.session.is_authenticated() {
            self.ensure_loaded(kind).await?;
            self.contains(kind, product_id)
        } else {
            read_id_list(self.store.as_ref(), kind.storage_key()).contains(&product_id)
        };

        let target = if present {
            Membership::Absent
        } else {
            Membership::Present
        };
        self.apply(kind, product_id, target).await?;
        Ok(target)
    }

    /// Fetch the set unless it is already loaded for the current identity.
    async fn ensure_loaded(&mut self, kind: SelectionKind) -> Result<(), SelectionError> {
        if self.loaded(kind).is_none() {
            self.list(kind).await?;
        }
        Ok(())
    }

    async fn apply(
        &mut self,
        kind: SelectionKind,
        product_id: ProductId,
        target: Membership,
    ) -> Result<(), SelectionError> {
        let changed = match self.session.credentials() {
            Some(credentials) => self.apply_remote(kind, product_id, target, &credentials).await?,
            None => self.apply_local(kind, product_id, target)?,
        };

        if changed {
            let (action, label) = match target {
                Membership::Present => ("Added to", "added"),
                Membership::Absent => ("Removed from", "removed"),
            };
            let id = product_id.to_string();
            add_breadcrumb(
                kind.storage_key(),
                &format!("{action} {}", kind.label()),
                Some(&[("product_id", id.as_str())]),
            );
            tracing::info!(%kind, %product_id, "Selection {label}");
            self.bus.publish(StoreEvent::SelectionChanged { kind });
        }
        Ok(())
    }

    fn apply_local(
        &mut self,
        kind: SelectionKind,
        product_id: ProductId,
        target: Membership,
    ) -> Result<bool, SelectionError> {
        let mut ids = read_id_list(self.store.as_ref(), kind.storage_key());
        let present = ids.contains(&product_id);

        let changed = match (target, present) {
            (Membership::Present, false) => {
                ids.push(product_id);
                true
            }
            (Membership::Absent, true) => {
                ids.retain(|id| *id != product_id);
                true
            }
            _ => false,
        };

        if changed {
            write_id_list(self.store.as_ref(), kind.storage_key(), &ids)?;
        }
        let entries = ids.into_iter().map(SelectionEntry::bare).collect();
        self.set_loaded(kind, Identity::Anonymous, entries);
        Ok(changed)
    }

    async fn apply_remote(
        &mut self,
        kind: SelectionKind,
        product_id: ProductId,
        target: Membership,
        credentials: &Credentials,
    ) -> Result<bool, SelectionError> {
        self.ensure_loaded(kind).await?;
        let known = self.loaded(kind).map(|entries| {
            Membership::from_contains(entries.iter().any(|e| e.product_id == product_id))
        });
        if known == Some(target) {
            return Ok(false);
        }

        let result = match target {
            Membership::Present => {
                self.remote
                    .add(kind, &credentials.token, product_id, credentials.user_id)
                    .await
            }
            Membership::Absent => {
                self.remote
                    .remove(kind, &credentials.token, product_id, credentials.user_id)
                    .await
            }
        };
        if let Err(source) = result {
            tracing::warn!(%kind, %product_id, error = %source, "Selection update rejected");
            return Err(SelectionError::UpdateFailed { kind, source });
        }

        // Confirmed; only now does the view change
        let identity = Self::identity(Some(credentials));
        let mut entries = self.loaded(kind).map(<[SelectionEntry]>::to_vec).unwrap_or_default();
        match target {
            Membership::Present => entries.push(SelectionEntry::bare(product_id)),
            Membership::Absent => entries.retain(|e| e.product_id != product_id),
        }
        self.set_loaded(kind, identity, entries);
        Ok(true)
    }
}
