//! Cart and wishlist commands.

use marigold_core::{Membership, ProductId, SelectionKind};
use marigold_storefront::api::SelectionEntry;
use marigold_storefront::error::Notice;
use marigold_storefront::selection::{CartSummary, SelectionStore, fill_snapshots};
use marigold_storefront::state::AppState;
use tracing::{info, warn};

use super::Outcome;

/// Give anonymous entries titles and prices from the catalog.
async fn with_details(state: &AppState, mut entries: Vec<SelectionEntry>) -> Vec<SelectionEntry> {
    if entries.iter().any(|e| e.snapshot.is_none()) {
        match state.api().products().await {
            Ok(products) => fill_snapshots(&mut entries, &products),
            Err(e) => warn!(error = %e, "Could not load product details"),
        }
    }
    entries
}

fn count_line(selections: &SelectionStore, kind: SelectionKind) {
    info!("{}: {} items", kind.label(), selections.entries(kind).len());
}

/// List the set.
pub async fn list(state: &AppState, kind: SelectionKind) -> Outcome {
    let mut selections = state.selections();
    let entries = selections.list(kind).await?;
    if entries.is_empty() {
        return Ok(Some(Notice::success(format!("Your {kind} is empty"))));
    }

    for entry in with_details(state, entries).await {
        match &entry.snapshot {
            Some(snapshot) => info!(
                "#{:<5} {:<40} x{}  {}",
                entry.product_id.to_string(),
                snapshot.title,
                entry.quantity,
                snapshot.price
            ),
            None => info!("#{}", entry.product_id),
        }
    }
    count_line(&selections, kind);
    Ok(None)
}

/// Add a product.
///
/// A logged-in set is fetched first; if that fails nothing is sent.
pub async fn add(state: &AppState, kind: SelectionKind, id: ProductId) -> Outcome {
    let mut selections = state.selections();
    selections.add(kind, id).await?;
    count_line(&selections, kind);
    Ok(Some(Notice::success(format!("Added to {}", kind.label()))))
}

/// Remove a product.
pub async fn remove(state: &AppState, kind: SelectionKind, id: ProductId) -> Outcome {
    let mut selections = state.selections();
    selections.remove(kind, id).await?;
    count_line(&selections, kind);
    Ok(Some(Notice::success(format!("Removed from {}", kind.label()))))
}

/// Add the product if absent, otherwise remove it.
pub async fn toggle(state: &AppState, kind: SelectionKind, id: ProductId) -> Outcome {
    let mut selections = state.selections();
    let membership = selections.toggle(kind, id).await?;
    count_line(&selections, kind);
    let text = match membership {
        Membership::Present => format!("Added to {}", kind.label()),
        Membership::Absent => format!("Removed from {}", kind.label()),
    };
    Ok(Some(Notice::success(text)))
}

/// Show cart totals.
pub async fn summary(state: &AppState) -> Outcome {
    let mut selections = state.selections();
    let entries = selections.list(SelectionKind::Cart).await?;
    let entries = with_details(state, entries).await;

    let summary = CartSummary::from_entries(&entries);
    info!("Items:    {}", summary.item_count);
    info!("Subtotal: {}", summary.subtotal);
    info!("Discount: -{}", summary.discount);
    info!("Total:    {}", summary.total);
    Ok(None)
}
