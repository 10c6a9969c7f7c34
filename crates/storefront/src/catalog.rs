//! Browsing helpers over catalog reads.

use rand::Rng;

use crate::api::Product;

/// Stock below this shows as "hurry".
const LOW_STOCK: u32 = 6;

/// Products whose title contains `term`, ignoring case.
///
/// A blank term matches everything.
#[must_use]
pub fn search<'a>(products: &'a [Product], term: &str) -> Vec<&'a Product> {
    let needle = term.trim().to_lowercase();
    products
        .iter()
        .filter(|p| needle.is_empty() || p.title.to_lowercase().contains(&needle))
        .collect()
}

/// Other products in the same category.
#[must_use]
pub fn related<'a>(products: &'a [Product], product: &Product) -> Vec<&'a Product> {
    products
        .iter()
        .filter(|p| p.id != product.id && p.category == product.category)
        .collect()
}

/// How a product's stock is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockLevel {
    /// Nothing left; restock is a guess.
    OutOfStock { restock_days: u32 },
    /// A few left.
    Low(u32),
    InStock(u32),
}

impl StockLevel {
    #[must_use]
    pub fn of(product: &Product) -> Self {
        match product.stock {
            0 => Self::OutOfStock {
                restock_days: restock_estimate_days(),
            },
            n if n < LOW_STOCK => Self::Low(n),
            n => Self::InStock(n),
        }
    }
}

impl std::fmt::Display for StockLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfStock { restock_days } => {
                write!(f, "Out of Stock (restock in {restock_days} days)")
            }
            Self::Low(n) => write!(f, "{n} Left - Hurry!"),
            Self::InStock(n) => write!(f, "{n} In Stock"),
        }
    }
}

/// A made-up restock estimate of 3 to 10 days.
///
/// The API has no restock data; this is display filler.
#[must_use]
pub fn restock_estimate_days() -> u32 {
    rand::rng().random_range(3..=10)
}
