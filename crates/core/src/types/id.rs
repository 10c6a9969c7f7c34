//! Integer identifiers the API hands out.
//!
//! Product and user ids share a representation but not a type, so a cart
//! call cannot be handed a user id by mistake.

macro_rules! api_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        /// Parses the decimal form kept in local storage, ignoring
        /// surrounding whitespace.
        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

api_id!(
    /// A registered account.
    UserId
);
api_id!(
    /// A catalog product; also the member type of carts and wishlists.
    ProductId
);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_serializes_as_bare_integer() {
        let id = ProductId::new(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        let parsed: Vec<ProductId> = serde_json::from_str("[42, 7]").unwrap();
        assert_eq!(parsed, vec![id, ProductId::from(7)]);
    }

    #[test]
    fn test_id_from_str_trims() {
        let id: UserId = " 7 ".parse().unwrap();
        assert_eq!(i32::from(id), 7);
        assert!("seven".parse::<UserId>().is_err());
    }

    #[test]
    fn test_id_display_honors_width() {
        assert_eq!(format!("{:<4}|", ProductId::new(13)), "13  |");
    }
}
