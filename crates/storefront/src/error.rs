//! Unified error handling with Sentry integration.
//!
//! Each layer has its own error enum; `ClientError` collects them for the
//! command surface and turns any of them into a user-facing [`Notice`].

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::forms::FieldErrors;
use crate::selection::SelectionError;
use crate::session::SessionError;
use crate::storage::StorageError;

/// Top-level error for storefront operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// The local store could not be written.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// An API call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Login, signup or profile update failed.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// A cart or wishlist operation failed.
    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    /// Form input failed validation.
    #[error("Invalid input: {0}")]
    Validation(#[from] FieldErrors),

    /// The caller may not perform this action.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad input outside a form (unknown field, unreadable file).
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ClientError {
    /// Whether this error points at a fault on our side rather than bad input
    /// or an API rejection.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        match self {
            Self::Config(_) | Self::Storage(_) => true,
            Self::Api(err) => matches!(err, ApiError::Parse(_) | ApiError::InvalidRequest(_)),
            Self::Session(err) => err.is_internal(),
            Self::Selection(err) => err.is_internal(),
            Self::Validation(_) | Self::Forbidden(_) | Self::BadRequest(_) => false,
        }
    }

    /// User-facing notification for this error.
    ///
    /// API messages pass through; internal details are hidden.
    #[must_use]
    pub fn notice(&self) -> Notice {
        let text = match self {
            Self::Config(_) | Self::Storage(_) => "Something went wrong.".to_string(),
            Self::Api(err) => err.user_message(),
            Self::Session(err) => err.user_message(),
            Self::Selection(err) => err.user_message(),
            Self::Validation(errors) => errors.to_string(),
            Self::Forbidden(what) => format!("You do not have access to {what}."),
            Self::BadRequest(message) => message.clone(),
        };
        Notice::Error(text)
    }

    /// Log the error and capture internal ones to Sentry.
    pub fn report(&self) {
        if self.is_internal() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Command failed"
            );
        } else {
            tracing::warn!(error = %self, "Command rejected");
        }
    }
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

/// A transient notification shown after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

impl Notice {
    #[must_use]
    pub fn success(text: impl Into<String>) -> Self {
        Self::Success(text.into())
    }

    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Success(text) | Self::Error(text) => text,
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text())
    }
}

/// Set the Sentry user context.
///
/// Call this after login so errors are associated with the user.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a user action.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "7")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
