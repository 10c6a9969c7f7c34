//! User and product management commands for admin and manager accounts.
//!
//! Role checks here only decide what the CLI offers; the API enforces access.

use std::path::Path;

use marigold_core::{ProductId, Role, UserId};
use marigold_storefront::api::ImageUpload;
use marigold_storefront::error::{ClientError, Notice};
use marigold_storefront::forms::{NewUserForm, ProductForm, SignupForm, UserUpdate};
use marigold_storefront::state::AppState;
use tracing::info;

use super::{Outcome, require_staff};
use crate::{ProductArgs, SignupArgs};

// =============================================================================
// Users
// =============================================================================

/// List every user.
pub async fn list_users(state: &AppState) -> Outcome {
    let token = require_staff(state, "user management")?;
    let users = state.api().users(&token).await?;
    for user in &users {
        info!(
            "#{:<5} {:<30} {:<30} {}",
            user.id.to_string(),
            user.display_name(),
            user.email.as_deref().unwrap_or("-"),
            user.role
        );
    }
    info!("{} users", users.len());
    Ok(None)
}

/// Create a user with a role.
pub async fn create_user(state: &AppState, details: SignupArgs, role: Option<Role>) -> Outcome {
    let token = require_staff(state, "user management")?;
    let form = NewUserForm {
        details: SignupForm::from(details),
        role,
    };
    form.validate()?;

    let created = state.api().create_user(&token, &form).await?;
    Ok(Some(Notice::success(format!(
        "Created {} ({}) as #{}",
        created.display_name(),
        created.role,
        created.id
    ))))
}

/// Update a user's profile.
pub async fn update_user(state: &AppState, id: UserId, update: UserUpdate) -> Outcome {
    let token = require_staff(state, "user management")?;
    update.validate()?;
    state.api().update_user(&token, id, &update).await?;
    Ok(Some(Notice::success("User updated")))
}

/// Delete a user.
pub async fn delete_user(state: &AppState, id: UserId) -> Outcome {
    let token = require_staff(state, "user management")?;
    state.api().delete_user(&token, id).await?;
    Ok(Some(Notice::success("User deleted")))
}

// =============================================================================
// Products
// =============================================================================

fn read_image(path: &Path) -> Result<ImageUpload, ClientError> {
    ImageUpload::from_path(path)
        .map_err(|e| ClientError::BadRequest(format!("Could not read {}: {e}", path.display())))
}

/// Build a product form from `name=value` pairs and image paths.
fn product_form(args: ProductArgs) -> Result<ProductForm, ClientError> {
    let mut form = ProductForm::new();
    for field in &args.fields {
        let (name, value) = field
            .split_once('=')
            .ok_or_else(|| ClientError::BadRequest(format!("Expected NAME=VALUE, got '{field}'")))?;
        form.set(name.trim(), value)
            .map_err(|name| ClientError::BadRequest(format!("Unknown product field '{name}'")))?;
    }
    form.thumbnail = args.thumbnail.as_deref().map(read_image).transpose()?;
    form.images = args.images.iter().map(|p| read_image(p)).collect::<Result<_, _>>()?;
    Ok(form)
}

/// Create a product.
pub async fn add_product(state: &AppState, args: ProductArgs) -> Outcome {
    let token = require_staff(state, "product management")?;
    let form = product_form(args)?;
    form.validate()?;
    state.api().add_product(&token, &form).await?;
    Ok(Some(Notice::success("Your product has been added successfully.")))
}

/// Update a product.
pub async fn update_product(
    state: &AppState,
    id: ProductId,
    args: ProductArgs,
    keep_images: Vec<String>,
) -> Outcome {
    let token = require_staff(state, "product management")?;
    let mut form = product_form(args)?;
    form.existing_images = keep_images;
    form.validate_update()?;
    state.api().update_product(&token, id, &form).await?;
    Ok(Some(Notice::success("Product updated")))
}

/// Delete a product.
pub async fn delete_product(state: &AppState, id: ProductId) -> Outcome {
    let token = require_staff(state, "product management")?;
    state.api().delete_product(&token, id).await?;
    Ok(Some(Notice::success("Your product has been deleted successfully.")))
}
