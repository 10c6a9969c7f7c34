//! Command implementations.
//!
//! Each command returns an optional [`Notice`] for `main` to show; listings
//! are written straight to the log as they are produced.

pub mod account;
pub mod manage;
pub mod products;
pub mod selections;

use marigold_storefront::api::{ApiError, Product};
use marigold_storefront::catalog::StockLevel;
use marigold_storefront::error::{ClientError, Notice};
use marigold_storefront::state::AppState;
use secrecy::SecretString;

/// What every command returns.
pub type Outcome = Result<Option<Notice>, ClientError>;

/// Token of a logged-in admin or manager.
fn require_staff(state: &AppState, what: &str) -> Result<SecretString, ClientError> {
    let session = state.session();
    let token = session.token().ok_or(ClientError::Api(ApiError::Unauthenticated))?;
    if !session.role().is_staff() {
        return Err(ClientError::Forbidden(what.to_string()));
    }
    Ok(token)
}

/// One-line product description for listings.
fn product_line(product: &Product) -> String {
    let price = if product.discount_percentage.is_zero() {
        product.price.to_string()
    } else {
        format!(
            "{} (was {}, -{}%)",
            product.sale_price(),
            product.price,
            product.discount_percentage.normalize()
        )
    };
    format!(
        "#{:<5} {:<40} {:>24}  {}",
        product.id.to_string(),
        product.title,
        price,
        StockLevel::of(product)
    )
}
