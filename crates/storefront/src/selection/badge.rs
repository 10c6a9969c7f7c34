//! Item-count badge kept current by bus events.

use std::ops::ControlFlow;

use marigold_core::SelectionKind;
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::RecvError;

use super::SelectionStore;
use crate::events::StoreEvent;

/// Shows how many items one selection set holds.
///
/// Holds its own [`SelectionStore`] and re-reads it whenever an event
/// concerns its kind. It never receives the new state from whoever made the
/// change.
#[derive(Debug)]
pub struct SelectionBadge {
    kind: SelectionKind,
    selections: SelectionStore,
    events: Receiver<StoreEvent>,
    count: usize,
}

impl SelectionBadge {
    /// Badge for `kind`, subscribed from now on. The count starts at 0 until
    /// the first [`refresh`](Self::refresh).
    #[must_use]
    pub fn new(kind: SelectionKind, selections: SelectionStore) -> Self {
        let events = selections.subscribe();
        Self {
            kind,
            selections,
            events,
            count: 0,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> SelectionKind {
        self.kind
    }

    /// The count as last refreshed.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Re-read the set. A failed read shows 0.
    pub async fn refresh(&mut self) -> usize {
        self.count = match self.selections.list(self.kind).await {
            Ok(entries) => entries.len(),
            Err(e) => {
                tracing::debug!(kind = %self.kind, error = %e, "Badge refresh failed");
                0
            }
        };
        self.count
    }

    /// Wait for the next relevant event and refresh.
    ///
    /// Returns `None` once the bus has closed. Missed events from lagging
    /// are treated as one relevant event.
    pub async fn next_update(&mut self) -> Option<usize> {
        loop {
            match self.events.recv().await {
                Ok(event) if event.concerns(self.kind) => return Some(self.refresh().await),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(kind = %self.kind, skipped, "Badge lagged behind the bus");
                    return Some(self.refresh().await);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Refresh now, then on every relevant event, passing each count to
    /// `on_change` until it breaks or the bus closes.
    pub async fn run(mut self, mut on_change: impl FnMut(usize) -> ControlFlow<()>) {
        let count = self.refresh().await;
        if on_change(count).is_break() {
            return;
        }
        while let Some(count) = self.next_update().await {
            if on_change(count).is_break() {
                return;
            }
        }
    }
}
