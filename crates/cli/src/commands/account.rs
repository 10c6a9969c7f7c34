//! Login, signup, logout and profile commands.

use std::path::Path;

use marigold_storefront::error::Notice;
use marigold_storefront::forms::{LoginForm, SignupForm};
use marigold_storefront::state::AppState;
use secrecy::SecretString;
use tracing::info;

use super::Outcome;
use crate::SignupArgs;

impl From<SignupArgs> for SignupForm {
    fn from(args: SignupArgs) -> Self {
        Self {
            firstname: args.firstname,
            lastname: args.lastname,
            age: args.age,
            email: args.email,
            phone: args.phone,
            password: SecretString::from(args.password),
        }
    }
}

/// Log in.
pub async fn login(state: &AppState, email: String, password: String) -> Outcome {
    let form = LoginForm::new(email, password);
    let profile = state.session().login(state.api(), &form).await?;
    info!("Home: {}", profile.role.home_area().path());
    Ok(Some(Notice::success(format!("Welcome back, {}!", profile.name))))
}

/// Create an account and log in.
pub async fn signup(state: &AppState, args: SignupArgs) -> Outcome {
    let form = SignupForm::from(args);
    let profile = state.session().signup(state.api(), &form).await?;
    Ok(Some(Notice::success(format!(
        "Account created. Welcome, {}!",
        profile.name
    ))))
}

/// Log out, clearing the local store.
pub fn logout(state: &AppState) -> Outcome {
    state.session().logout()?;
    Ok(Some(Notice::success("Logged out")))
}

/// Show the cached profile.
pub fn whoami(state: &AppState) -> Option<Notice> {
    let Some(profile) = state.session().profile() else {
        return Some(Notice::success("Not logged in"));
    };

    info!("{} ({})", profile.name, profile.role);
    for (label, value) in [
        ("Email", &profile.email),
        ("Phone", &profile.phone),
        ("Age", &profile.age),
    ] {
        if let Some(value) = value {
            info!("  {label:<6} {value}");
        }
    }
    if let Some(id) = profile.id {
        info!("  Id     {id}");
    }
    info!(
        "  Photo  {}",
        if profile.photo.is_some() { "set" } else { "none" }
    );
    None
}

/// Store an image file as the profile photo.
pub fn set_photo(state: &AppState, path: &Path) -> Outcome {
    state.session().set_photo(path)?;
    Ok(Some(Notice::success("Profile photo updated")))
}

/// Remove the profile photo.
pub fn clear_photo(state: &AppState) -> Outcome {
    state.session().clear_photo()?;
    Ok(Some(Notice::success("Profile photo removed")))
}
