//! Cart totals and view-side quantity changes.

use marigold_core::{Price, ProductId};

use crate::api::{Product, ProductSnapshot, SelectionEntry};

/// Order totals for a loaded cart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CartSummary {
    /// Sum of list price times quantity.
    pub subtotal: Price,
    /// Sum of discount amount times quantity.
    pub discount: Price,
    /// `subtotal - discount`. All three saturate rather than overflow.
    pub total: Price,
    /// Sum of quantities.
    pub item_count: u32,
}

impl CartSummary {
    /// Totals over `entries`. Entries without a snapshot count towards
    /// `item_count` only.
    #[must_use]
    pub fn from_entries(entries: &[SelectionEntry]) -> Self {
        let mut summary = Self::default();
        for entry in entries {
            summary.item_count = summary.item_count.saturating_add(entry.quantity);
            let Some(snapshot) = &entry.snapshot else {
                continue;
            };
            summary.subtotal = summary.subtotal + snapshot.price.times(entry.quantity);
            summary.discount = summary.discount
                + snapshot
                    .price
                    .discount_amount(snapshot.discount_percentage)
                    .times(entry.quantity);
        }
        summary.total = summary.subtotal - summary.discount;
        summary
    }
}

/// Change a line's quantity by `delta` for display.
///
/// The snapshot stock moves the other way, so the line can never claim more
/// than was in stock at load time. Returns `false` (and changes nothing) if
/// the line is missing or the change would take quantity below 1 or stock
/// below 0. Nothing is sent to the API.
pub fn adjust_quantity(entries: &mut [SelectionEntry], product_id: ProductId, delta: i32) -> bool {
    let Some(entry) = entries.iter_mut().find(|e| e.product_id == product_id) else {
        return false;
    };

    let quantity = i64::from(entry.quantity) + i64::from(delta);
    if quantity < 1 {
        return false;
    }

    let stock = match &entry.snapshot {
        Some(snapshot) => {
            let stock = i64::from(snapshot.stock) - i64::from(delta);
            if stock < 0 {
                return false;
            }
            Some(stock)
        }
        None => None,
    };

    let (Ok(quantity), Ok(stock)) = (
        u32::try_from(quantity),
        stock.map(u32::try_from).transpose(),
    ) else {
        return false;
    };

    entry.quantity = quantity;
    if let (Some(snapshot), Some(stock)) = (entry.snapshot.as_mut(), stock) {
        snapshot.stock = stock;
    }
    true
}

/// Give snapshot-less entries a snapshot from `products`.
///
/// Anonymous carts hold ids only; this lets them be totalled against a
/// catalog read. Entries with no matching product are left as they are.
pub fn fill_snapshots(entries: &mut [SelectionEntry], products: &[Product]) {
    for entry in entries.iter_mut().filter(|e| e.snapshot.is_none()) {
        if let Some(product) = products.iter().find(|p| p.id == entry.product_id) {
            entry.snapshot = Some(ProductSnapshot::from(product));
        }
    }
}
