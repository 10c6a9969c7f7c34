//! Selection kinds: the two product-id sets a shopper builds up.

use serde::{Deserialize, Serialize};

/// Which selection set an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionKind {
    /// Shopping cart (the API calls it the basket).
    Cart,
    /// Wishlist.
    Wishlist,
}

impl SelectionKind {
    /// Both kinds, cart first.
    pub const ALL: [Self; 2] = [Self::Cart, Self::Wishlist];

    /// Local storage key holding the anonymous id list.
    #[must_use]
    pub const fn storage_key(self) -> &'static str {
        match self {
            Self::Cart => "cart",
            Self::Wishlist => "wishlist",
        }
    }

    /// API path of the authenticated selection resource.
    #[must_use]
    pub const fn api_path(self) -> &'static str {
        match self {
            Self::Cart => "/basket",
            Self::Wishlist => "/wishlist",
        }
    }

    /// Name of the change signal other surfaces listen for.
    #[must_use]
    pub const fn signal_name(self) -> &'static str {
        match self {
            Self::Cart => "cartUpdated",
            Self::Wishlist => "wishlistUpdated",
        }
    }

    /// Human label for notices ("Added to Cart").
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cart => "Cart",
            Self::Wishlist => "Wishlist",
        }
    }

    /// Kind whose local storage key is `key`, if any.
    #[must_use]
    pub fn from_storage_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.storage_key() == key)
    }
}

impl std::fmt::Display for SelectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.storage_key())
    }
}

/// Membership of one product in one selection set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Membership {
    /// Not in the set.
    Absent,
    /// In the set.
    Present,
}

impl Membership {
    /// Membership from a `contains` result.
    #[must_use]
    pub const fn from_contains(present: bool) -> Self {
        if present { Self::Present } else { Self::Absent }
    }

    /// Whether the product is in the set.
    #[must_use]
    pub const fn is_present(self) -> bool {
        matches!(self, Self::Present)
    }
}
