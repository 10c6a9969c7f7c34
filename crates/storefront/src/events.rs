//! Typed change notifications shared between storefront surfaces.
//!
//! Every surface that shows selection state (navigation badge, cart page,
//! wishlist page, product cards) holds a receiver on the same [`EventBus`].
//! Events carry no payload beyond what changed: listeners re-read their own
//! store to find the new state. Delivery is fire-and-forget with no sequence
//! numbers, and a receiver that falls behind skips the missed events.

use marigold_core::SelectionKind;
use tokio::sync::broadcast;

/// Default number of undelivered events a receiver may lag behind.
const DEFAULT_CAPACITY: usize = 64;

/// A change worth re-reading state for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// Membership of a selection set changed.
    SelectionChanged {
        /// Which set changed.
        kind: SelectionKind,
    },
    /// A key in the local durable store was written or removed.
    StorageChanged {
        /// The affected key.
        key: String,
    },
    /// Login, signup or logout happened.
    SessionChanged,
}

impl StoreEvent {
    /// Whether a listener displaying `kind` should refresh on this event.
    #[must_use]
    pub fn concerns(&self, kind: SelectionKind) -> bool {
        match self {
            Self::SelectionChanged { kind: changed } => *changed == kind,
            Self::StorageChanged { key } => key == kind.storage_key(),
            Self::SessionChanged => true,
        }
    }

    /// The legacy signal name for this event, where one exists.
    #[must_use]
    pub fn signal_name(&self) -> &str {
        match self {
            Self::SelectionChanged { kind } => kind.signal_name(),
            Self::StorageChanged { .. } => "storage",
            Self::SessionChanged => "session",
        }
    }
}

/// Process-wide broadcast channel of [`StoreEvent`]s.
///
/// Cheap to clone; all clones publish into the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<StoreEvent>,
}

impl EventBus {
    /// Create a bus with the default lag capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a bus that buffers up to `capacity` events per receiver.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to every current subscriber.
    ///
    /// Having no subscribers is not an error.
    pub fn publish(&self, event: StoreEvent) {
        let signal = event.signal_name().to_owned();
        match self.sender.send(event) {
            Ok(receivers) => tracing::trace!(signal = %signal, receivers, "Published store event"),
            Err(_) => tracing::trace!(signal = %signal, "No listeners for store event"),
        }
    }

    /// Subscribe to events published after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_concerns() {
        let cart = StoreEvent::SelectionChanged {
            kind: SelectionKind::Cart,
        };
        assert!(cart.concerns(SelectionKind::Cart));
        assert!(!cart.concerns(SelectionKind::Wishlist));

        let storage = StoreEvent::StorageChanged {
            key: "wishlist".to_string(),
        };
        assert!(storage.concerns(SelectionKind::Wishlist));
        assert!(!storage.concerns(SelectionKind::Cart));

        assert!(StoreEvent::SessionChanged.concerns(SelectionKind::Cart));
    }

    #[test]
    fn test_signal_names() {
        let event = StoreEvent::SelectionChanged {
            kind: SelectionKind::Wishlist,
        };
        assert_eq!(event.signal_name(), "wishlistUpdated");
    }

    #[test]
    fn test_publish_without_listeners_is_ok() {
        let bus = EventBus::new();
        bus.publish(StoreEvent::SessionChanged);
        assert_eq!(bus.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_every_subscriber_receives() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.clone().subscribe();

        bus.publish(StoreEvent::SelectionChanged {
            kind: SelectionKind::Cart,
        });

        let expected = StoreEvent::SelectionChanged {
            kind: SelectionKind::Cart,
        };
        assert_eq!(a.recv().await.unwrap(), expected);
        assert_eq!(b.recv().await.unwrap(), expected);
    }
}
