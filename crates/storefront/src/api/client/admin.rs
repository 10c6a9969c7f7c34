//! User and product management endpoints for admin and manager accounts.
//!
//! The API enforces who may call these; the client only sends the token.

use marigold_core::{ProductId, UserId};
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use secrecy::SecretString;
use serde_json::json;
use tracing::instrument;

use super::ApiClient;
use crate::api::ApiError;
use crate::api::types::{AuthPayload, ImageUpload, UserProfile};
use crate::forms::{NewUserForm, ProductForm, UserUpdate};

impl ApiClient {
    // =========================================================================
    // Users
    // =========================================================================

    /// Every registered user.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn users(&self, token: &SecretString) -> Result<Vec<UserProfile>, ApiError> {
        let request = self.authed(Method::GET, "users", token)?;
        self.send(request).await
    }

    /// Create an account with an explicit role.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the account or the request fails.
    #[instrument(skip(self, token, form))]
    pub async fn create_user(
        &self,
        token: &SecretString,
        form: &NewUserForm,
    ) -> Result<UserProfile, ApiError> {
        let request = self
            .authed(Method::POST, "auth/signup", token)?
            .json(&form.to_body());
        let payload: AuthPayload = self.send(request).await?;
        Ok(payload.user.into_profile())
    }

    /// Replace a user's profile fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token, update))]
    pub async fn update_user(
        &self,
        token: &SecretString,
        id: UserId,
        update: &UserUpdate,
    ) -> Result<(), ApiError> {
        let request = self
            .authed(Method::PUT, &format!("users/{id}"), token)?
            .json(&update.to_body());
        self.send_unit(request).await
    }

    /// Delete a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn delete_user(&self, token: &SecretString, id: UserId) -> Result<(), ApiError> {
        let request = self.authed(Method::DELETE, &format!("users/{id}"), token)?;
        self.send_unit(request).await
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Create a product from a multipart form.
    ///
    /// # Errors
    ///
    /// Returns an error if an upload is malformed or the request fails.
    #[instrument(skip(self, token, form))]
    pub async fn add_product(&self, token: &SecretString, form: &ProductForm) -> Result<(), ApiError> {
        let mut multipart = Form::new();
        for (name, value) in form.text_fields() {
            multipart = multipart.text(name, value.to_owned());
        }
        let multipart = attach_images(multipart, form)?;

        let request = self
            .authed(Method::POST, "products/addProduct", token)?
            .multipart(multipart);
        self.send_unit(request).await?;

        self.invalidate_catalog().await;
        Ok(())
    }

    /// Update a product from a multipart form.
    ///
    /// Only non-blank text fields are sent. `existing_images` lists the
    /// gallery images to keep.
    ///
    /// # Errors
    ///
    /// Returns an error if an upload is malformed or the request fails.
    #[instrument(skip(self, token, form), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        token: &SecretString,
        id: ProductId,
        form: &ProductForm,
    ) -> Result<(), ApiError> {
        let mut multipart = Form::new();
        for (name, value) in form.text_fields().filter(|(_, v)| !v.trim().is_empty()) {
            multipart = multipart.text(name, value.to_owned());
        }
        let existing = serde_json::to_string(&form.existing_images)?;
        let multipart = attach_images(multipart.text("existingImages", existing), form)?;

        let request = self
            .authed(Method::PUT, &format!("products/{id}"), token)?
            .multipart(multipart);
        self.send_unit(request).await?;

        self.invalidate_catalog().await;
        Ok(())
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn delete_product(&self, token: &SecretString, id: ProductId) -> Result<(), ApiError> {
        let request = self
            .authed(Method::DELETE, "products/deleteProduct", token)?
            .json(&json!({ "id": id }));
        self.send_unit(request).await?;

        self.invalidate_catalog().await;
        Ok(())
    }
}

fn attach_images(mut multipart: Form, form: &ProductForm) -> Result<Form, ApiError> {
    if let Some(thumbnail) = &form.thumbnail {
        multipart = multipart.part("thumbnail", image_part(thumbnail)?);
    }
    for image in &form.images {
        multipart = multipart.part("images", image_part(image)?);
    }
    Ok(multipart)
}

fn image_part(upload: &ImageUpload) -> Result<Part, ApiError> {
    Part::bytes(upload.bytes.clone())
        .file_name(upload.file_name.clone())
        .mime_str(upload.mime)
        .map_err(|e| ApiError::InvalidRequest(format!("{}: {e}", upload.file_name)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_image_part_accepts_known_mime() {
        let upload = ImageUpload {
            file_name: "lamp.png".to_string(),
            mime: "image/png",
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
        };
        assert!(image_part(&upload).is_ok());
    }

    #[test]
    fn test_image_part_rejects_bad_mime() {
        let upload = ImageUpload {
            file_name: "lamp".to_string(),
            mime: "not a mime",
            bytes: Vec::new(),
        };
        assert!(matches!(
            image_part(&upload),
            Err(ApiError::InvalidRequest(_))
        ));
    }
}
