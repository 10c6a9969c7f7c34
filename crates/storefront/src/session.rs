//! Who is logged in, as recorded in the local store.
//!
//! The token and a denormalized copy of the profile live under the
//! `user*` keys. Nothing here is re-verified against the API: the role only
//! decides which areas this client offers, and the API enforces the rest.
//!
//! A [`Session`] reads the store on every call, so a login or logout made
//! through any handle is seen by all of them.

use std::path::Path;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use marigold_core::{Area, Role, UserId};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::instrument;

use crate::api::{ApiClient, ApiError, AuthUser, mime_for_path};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::events::{EventBus, StoreEvent};
use crate::forms::{FieldErrors, LoginForm, SignupForm};
use crate::storage::{LocalStore, StorageError, keys};

/// Errors from session changes.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The form failed validation; nothing was sent.
    #[error("invalid form: {0}")]
    Invalid(#[from] FieldErrors),

    /// The API rejected the request or could not be reached.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The local store could not be written.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The profile photo could not be read.
    #[error("could not read photo: {0}")]
    Photo(#[from] std::io::Error),
}

impl SessionError {
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Api(ApiError::Parse(_) | ApiError::InvalidRequest(_))
        )
    }

    /// Message suitable for showing to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Invalid(errors) => errors.to_string(),
            Self::Api(err) => err.user_message(),
            Self::Storage(_) => "Something went wrong.".to_string(),
            Self::Photo(err) => format!("Could not read photo: {err}"),
        }
    }
}

/// What a request needs to act as the logged-in user.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub token: SecretString,
    pub user_id: Option<UserId>,
}

/// Profile fields cached alongside the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredProfile {
    pub id: Option<UserId>,
    pub name: String,
    pub role: Role,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub age: Option<String>,
    /// `data:` URI of the profile photo.
    pub photo: Option<String>,
}

/// Handle on the logged-in identity.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn LocalStore>,
    bus: EventBus,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .field("role", &self.role())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Session backed by `store`, announcing changes on `bus`.
    #[must_use]
    pub fn load(store: Arc<dyn LocalStore>, bus: EventBus) -> Self {
        Self { store, bus }
    }

    /// The bearer token, if logged in.
    #[must_use]
    pub fn token(&self) -> Option<SecretString> {
        self.store
            .get(keys::USER_TOKEN)
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Token and user id, if logged in.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        self.token().map(|token| Credentials {
            token,
            user_id: self.user_id(),
        })
    }

    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.store
            .get(keys::USER_ID)
            .and_then(|id| id.parse::<UserId>().ok())
    }

    /// Role recorded at login; `User` when absent or unreadable.
    #[must_use]
    pub fn role(&self) -> Role {
        if !self.is_authenticated() {
            return Role::User;
        }
        self.store
            .get(keys::USER_ROLE)
            .and_then(|role| role.parse::<Role>().ok())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn can_access(&self, area: Area) -> bool {
        self.role().can_access(area)
    }

    #[must_use]
    pub fn home_area(&self) -> Area {
        self.role().home_area()
    }

    /// Cached profile, if logged in.
    #[must_use]
    pub fn profile(&self) -> Option<StoredProfile> {
        if !self.is_authenticated() {
            return None;
        }
        let get = |key| self.store.get(key).filter(|v| !v.is_empty());
        Some(StoredProfile {
            id: self.user_id(),
            name: get(keys::USER_NAME).unwrap_or_default(),
            role: self.role(),
            email: get(keys::USER_EMAIL),
            phone: get(keys::USER_PHONE),
            age: get(keys::USER_AGE),
            photo: get(keys::USER_PHOTO),
        })
    }

    // =========================================================================
    // Changes
    // =========================================================================

    /// Log in and record the session.
    ///
    /// Anonymous cart and wishlist contents stay where they are and are not
    /// sent to the API.
    ///
    /// # Errors
    ///
    /// Returns an error if the form is invalid, the API rejects the login, or
    /// the store cannot be written.
    #[instrument(skip(self, api, form))]
    pub async fn login(&self, api: &ApiClient, form: &LoginForm) -> Result<StoredProfile, SessionError> {
        form.validate()?;
        let user = api.login(form).await?;
        self.establish(&user)
    }

    /// Create an account and record the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the form is invalid, the API rejects the account,
    /// or the store cannot be written.
    #[instrument(skip(self, api, form))]
    pub async fn signup(&self, api: &ApiClient, form: &SignupForm) -> Result<StoredProfile, SessionError> {
        form.validate()?;
        let user = api.signup(form).await?;
        self.establish(&user)
    }

    /// Record an authenticated user in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written. The token is written
    /// last, so a failed write leaves the store anonymous.
    pub fn establish(&self, user: &AuthUser) -> Result<StoredProfile, SessionError> {
        let profile = &user.profile;
        self.store.remove(keys::USER_TOKEN)?;
        self.store.set(keys::USER_NAME, &profile.display_name())?;
        self.store.set(keys::USER_ROLE, profile.role.as_str())?;
        self.store.set(keys::USER_ID, &profile.id.to_string())?;
        for (key, value) in [
            (keys::USER_EMAIL, &profile.email),
            (keys::USER_PHONE, &profile.phone),
            (keys::USER_AGE, &profile.age),
        ] {
            match value {
                Some(value) => self.store.set(key, value)?,
                None => self.store.remove(key)?,
            }
        }
        self.store.set(keys::USER_TOKEN, user.token.expose_secret())?;

        set_sentry_user(&profile.id, profile.email.as_deref());
        tracing::info!(user_id = %profile.id, role = %profile.role, "Session started");
        self.bus.publish(StoreEvent::SessionChanged);

        Ok(StoredProfile {
            id: Some(profile.id),
            name: profile.display_name(),
            role: profile.role,
            email: profile.email.clone(),
            phone: profile.phone.clone(),
            age: profile.age.clone(),
            photo: self.store.get(keys::USER_PHOTO),
        })
    }

    /// Forget the session and everything else in the local store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be cleared.
    pub fn logout(&self) -> Result<(), SessionError> {
        self.store.clear()?;
        clear_sentry_user();
        tracing::info!("Session ended");
        self.bus.publish(StoreEvent::SessionChanged);
        Ok(())
    }

    /// Store an image file as the profile photo.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the store written.
    pub fn set_photo(&self, path: &Path) -> Result<(), SessionError> {
        let bytes = std::fs::read(path)?;
        let uri = format!("data:{};base64,{}", mime_for_path(path), BASE64.encode(bytes));
        self.store.set(keys::USER_PHOTO, &uri)?;
        Ok(())
    }

    /// Remove the profile photo.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn clear_photo(&self) -> Result<(), SessionError> {
        self.store.remove(keys::USER_PHOTO)?;
        Ok(())
    }
}
