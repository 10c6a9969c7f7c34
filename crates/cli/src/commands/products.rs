//! Catalog browsing commands.

use marigold_core::ProductId;
use marigold_storefront::catalog::{self, StockLevel};
use marigold_storefront::state::AppState;
use tracing::info;

use super::{Outcome, product_line};

/// List every product.
pub async fn list(state: &AppState) -> Outcome {
    let products = state.api().products().await?;
    for product in &products {
        info!("{}", product_line(product));
    }
    info!("{} products", products.len());
    Ok(None)
}

/// Search product titles.
pub async fn search(state: &AppState, term: &str) -> Outcome {
    let products = state.api().products().await?;
    let hits = catalog::search(&products, term);
    if hits.is_empty() {
        info!("No products match '{term}'");
    }
    for product in hits {
        info!("{}", product_line(product));
    }
    Ok(None)
}

/// List one category.
pub async fn category(state: &AppState, name: &str) -> Outcome {
    let products = state.api().products_by_category(name).await?;
    for product in &products {
        info!("{}", product_line(product));
    }
    info!("{} products in {name}", products.len());
    Ok(None)
}

/// Show one product in detail, with related products and whether it is
/// already in the cart or wishlist.
pub async fn show(state: &AppState, id: ProductId) -> Outcome {
    let api = state.api();
    let product = api.product(id).await?;

    info!("{} (#{})", product.title, product.id);
    if let Some(brand) = &product.brand {
        info!("  Brand:       {brand}");
    }
    info!("  Category:    {}", product.category);
    info!("  Price:       {}", product.sale_price());
    if !product.discount_percentage.is_zero() {
        info!(
            "  Was:         {} (-{}%)",
            product.price,
            product.discount_percentage.normalize()
        );
    }
    info!("  Rating:      {:.1}", product.rating);
    info!("  Stock:       {}", StockLevel::of(&product));
    for (label, value) in [
        ("Warranty", &product.warranty_information),
        ("Shipping", &product.shipping_information),
        ("Returns", &product.return_policy),
    ] {
        if let Some(value) = value {
            info!("  {label:<12} {value}");
        }
    }
    if !product.description.is_empty() {
        info!("  {}", product.description);
    }
    for path in product.thumbnail.iter().chain(&product.images) {
        info!("  Image:       {}", api.asset_url(path));
    }
    for review in &product.reviews {
        info!(
            "  Review {:.0}/5 by {}: {}",
            review.rating,
            review.reviewer_name.as_deref().unwrap_or("anonymous"),
            review.comment
        );
    }

    let mut selections = state.selections();
    for kind in marigold_core::SelectionKind::ALL {
        // Membership is a nicety here; a failed read just leaves it out
        if selections.list(kind).await.is_ok() && selections.contains(kind, id) {
            info!("  In your {kind}");
        }
    }

    // Related products come from a second read; failing it is not fatal
    match api.products_by_category(&product.category).await {
        Ok(in_category) => {
            let related = catalog::related(&in_category, &product);
            if !related.is_empty() {
                info!("Related:");
            }
            for other in related {
                info!("{}", product_line(other));
            }
        }
        Err(e) => tracing::warn!(error = %e, "Could not load related products"),
    }

    Ok(None)
}
