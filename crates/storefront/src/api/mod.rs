//! Storefront REST API client.
//!
//! # Architecture
//!
//! - The API is the source of truth for catalog, selections and accounts;
//!   nothing is synced locally beyond the anonymous selection lists
//! - Responses are decoded into the typed contracts in [`types`] at the
//!   boundary
//! - Catalog reads are cached in memory via `moka` (5 minute TTL by default)
//!
//! # Example
//!
//! ```rust,ignore
//! use marigold_storefront::api::ApiClient;
//!
//! let client = ApiClient::new(&config.api)?;
//!
//! let products = client.products().await?;
//! let beauty = client.products_by_category("beauty").await?;
//!
//! let user = client.login(&login_form).await?;
//! let cart = client.selections(SelectionKind::Cart, &user.token).await?;
//! ```

mod client;
pub mod types;

pub use client::{ApiClient, RemoteSelections};
pub use types::*;

use thiserror::Error;

/// Longest error body excerpt kept in an [`ApiError::Api`] message.
const MAX_MESSAGE_CHARS: usize = 200;

/// Errors that can occur when talking to the storefront API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failed (connection refused, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The response body did not match the expected contract.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An authenticated call was attempted without a token.
    #[error("Not logged in")]
    Unauthenticated,

    /// A request could not be built (bad header value, bad upload).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Best-effort message suitable for showing to the user.
    ///
    /// API-provided messages pass through; transport and parse failures get
    /// a generic message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::Unauthenticated => "Please log in first.".to_string(),
            Self::Http(_) => "Could not reach the store. Please try again.".to_string(),
            Self::Parse(_) | Self::InvalidRequest(_) => "Something went wrong.".to_string(),
        }
    }

    /// HTTP status of an API rejection.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Pull a human message out of an error response body.
///
/// Prefers the JSON `message` field, falls back to a truncated raw body, and
/// finally to the status's canonical reason.
pub(crate) fn extract_error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(types::ErrorBody {
        message: Some(message),
    }) = serde_json::from_str::<types::ErrorBody>(body)
        && !message.trim().is_empty()
    {
        return message;
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string();
    }

    trimmed.chars().take(MAX_MESSAGE_CHARS).collect()
}
