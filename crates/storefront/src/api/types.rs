//! Typed contracts for storefront API responses.
//!
//! The API is loose about shapes: most endpoints wrap their payload in
//! `{ "data": ... }` but some return it bare, numbers sometimes arrive as
//! strings, and most product fields may be missing. These types absorb that
//! at the boundary so nothing past here has to guess.

use std::path::Path;

use marigold_core::{Price, ProductId, Role, SelectionKind, UserId};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// Envelopes
// =============================================================================

/// Either `{ "data": T }` or a bare `T`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } | Self::Bare(data) => data,
        }
    }
}

/// Error body the API sends alongside non-success statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: Option<String>,
}

// =============================================================================
// Products
// =============================================================================

/// A catalog product.
///
/// Only `id` is required on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub price: Price,
    #[serde(default)]
    pub discount_percentage: Decimal,
    #[serde(default)]
    pub rating: f64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub stock: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub depth: Option<f64>,
    #[serde(default)]
    pub warranty_information: Option<String>,
    #[serde(default)]
    pub shipping_information: Option<String>,
    #[serde(default)]
    pub availability_status: Option<String>,
    #[serde(default)]
    pub return_policy: Option<String>,
    #[serde(default, deserialize_with = "lenient_optional_count")]
    pub minimum_order_quantity: Option<u32>,
    /// Relative path of the thumbnail image.
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Relative paths of gallery images.
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

impl Product {
    /// Price after the product's discount.
    #[must_use]
    pub fn sale_price(&self) -> Price {
        self.price.discounted(self.discount_percentage)
    }

    /// Whether the product is out of stock.
    #[must_use]
    pub const fn is_out_of_stock(&self) -> bool {
        self.stock == 0
    }
}

/// A customer review attached to a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub reviewer_name: Option<String>,
    #[serde(default)]
    pub reviewer_email: Option<String>,
}

// =============================================================================
// Selections
// =============================================================================

/// Product fields copied into a cart line when it is loaded.
///
/// Nothing keeps this in step with the catalog after loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSnapshot {
    pub title: String,
    pub price: Price,
    pub stock: u32,
    pub discount_percentage: Decimal,
}

impl From<&Product> for ProductSnapshot {
    fn from(product: &Product) -> Self {
        Self {
            title: product.title.clone(),
            price: product.price,
            stock: product.stock,
            discount_percentage: product.discount_percentage,
        }
    }
}

/// One member of a selection set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionEntry {
    pub product_id: ProductId,
    /// Always at least 1.
    pub quantity: u32,
    /// Present for cart lines loaded from the API.
    pub snapshot: Option<ProductSnapshot>,
}

impl SelectionEntry {
    /// An entry known only by id, quantity 1.
    #[must_use]
    pub const fn bare(product_id: ProductId) -> Self {
        Self {
            product_id,
            quantity: 1,
            snapshot: None,
        }
    }
}

/// A `/basket` or `/wishlist` list item as the API returns it.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SelectionItem {
    #[serde(default, deserialize_with = "lenient_optional_count")]
    pub quantity: Option<u32>,
    pub product: Product,
}

impl SelectionItem {
    pub(crate) fn into_entry(self, kind: SelectionKind) -> SelectionEntry {
        let snapshot = match kind {
            SelectionKind::Cart => Some(ProductSnapshot::from(&self.product)),
            SelectionKind::Wishlist => None,
        };
        SelectionEntry {
            product_id: self.product.id,
            quantity: self.quantity.unwrap_or(1).max(1),
            snapshot,
        }
    }
}

/// Body of selection writes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SelectionWrite {
    pub product_id: ProductId,
    pub user_id: Option<UserId>,
}

// =============================================================================
// Users
// =============================================================================

/// Profile fields the API returns for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub age: Option<String>,
    #[serde(default)]
    pub role: Role,
}

impl UserProfile {
    /// `name` if the API sent one, else first and last name joined.
    #[must_use]
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_owned();
        }
        [self.firstname.as_deref(), self.lastname.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A logged-in user: bearer token plus profile.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub token: SecretString,
    pub profile: UserProfile,
}

/// `user` object from login and signup responses.
///
/// Login names the token `token`, signup names it `accessToken`.
#[derive(Debug, Deserialize)]
pub(crate) struct AuthUserWire {
    #[serde(alias = "accessToken")]
    token: String,
    #[serde(flatten)]
    profile: UserProfile,
}

impl AuthUserWire {
    /// Drop the token, keeping the profile.
    pub(crate) fn into_profile(self) -> UserProfile {
        self.profile
    }
}

/// `{ "user": ... }` payload of auth responses.
#[derive(Debug, Deserialize)]
pub(crate) struct AuthPayload {
    pub user: AuthUserWire,
}

impl From<AuthUserWire> for AuthUser {
    fn from(wire: AuthUserWire) -> Self {
        Self {
            token: SecretString::from(wire.token),
            profile: wire.profile,
        }
    }
}

// =============================================================================
// Uploads
// =============================================================================

/// An image file attached to a multipart product form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Read an image from disk, inferring its MIME type from the extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map_or_else(|| "upload".to_owned(), |n| n.to_string_lossy().into_owned());
        Ok(Self {
            file_name,
            mime: mime_for_path(path),
            bytes,
        })
    }
}

/// MIME type for an image path, by extension.
#[must_use]
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

// =============================================================================
// Lenient scalars
// =============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Int(i64),
    Float(f64),
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<StringOrNumber>::deserialize(deserializer)?.map(|value| match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Int(n) => n.to_string(),
            StringOrNumber::Float(n) => n.to_string(),
        }),
    )
}

fn lenient_optional_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<StringOrNumber>::deserialize(deserializer)?.and_then(|value| match value {
            StringOrNumber::String(s) => {
                let s = s.trim();
                s.parse::<u32>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(whole_count))
            }
            StringOrNumber::Int(n) => u32::try_from(n.max(0)).ok(),
            StringOrNumber::Float(n) => whole_count(n),
        }),
    )
}

/// A float that holds a whole number of units, clamped at zero like integers.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_count(n: f64) -> Option<u32> {
    if !n.is_finite() || n.fract() != 0.0 {
        return None;
    }
    let n = n.max(0.0);
    (n <= f64::from(u32::MAX)).then_some(n as u32)
}

fn lenient_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_optional_count(deserializer).map(Option::unwrap_or_default)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_envelope_wrapped_and_bare() {
        let wrapped: Envelope<Vec<i32>> = serde_json::from_str(r#"{"data":[1,2]}"#).unwrap();
        assert_eq!(wrapped.into_inner(), vec![1, 2]);

        let bare: Envelope<Vec<i32>> = serde_json::from_str("[3]").unwrap();
        assert_eq!(bare.into_inner(), vec![3]);
    }

    #[test]
    fn test_product_minimal() {
        let product: Product = serde_json::from_str(r#"{"id": 5}"#).unwrap();
        assert_eq!(product.id, ProductId::new(5));
        assert_eq!(product.price, Price::ZERO);
        assert!(product.is_out_of_stock());
        assert!(product.images.is_empty());
    }

    #[test]
    fn test_product_full_fields() {
        let product: Product = serde_json::from_str(
            r#"{
                "id": 1,
                "title": "Essence Mascara",
                "category": "beauty",
                "price": 9.99,
                "discountPercentage": 10,
                "rating": 4.9,
                "stock": "5",
                "tags": ["beauty", "mascara"],
                "warrantyInformation": "1 month warranty",
                "minimumOrderQuantity": 24,
                "thumbnail": "/uploads/mascara.png",
                "reviews": [{"rating": 5, "comment": "Great", "reviewerName": "Eleanor"}]
            }"#,
        )
        .unwrap();
        assert_eq!(product.price, Price::from_cents(999));
        assert_eq!(product.stock, 5);
        assert_eq!(product.sale_price(), Price::from_cents(899));
        assert_eq!(product.minimum_order_quantity, Some(24));
        assert_eq!(product.reviews.len(), 1);
        assert_eq!(product.reviews[0].reviewer_name.as_deref(), Some("Eleanor"));
    }

    #[test]
    fn test_whole_float_counts_decode() {
        let product: Product = serde_json::from_str(
            r#"{"id": 3, "stock": 12.0, "minimumOrderQuantity": "24.0"}"#,
        )
        .unwrap();
        assert_eq!(product.stock, 12);
        assert!(!product.is_out_of_stock());
        assert_eq!(product.minimum_order_quantity, Some(24));

        let item: SelectionItem =
            serde_json::from_str(r#"{"quantity": "2.0", "product": {"id": 3, "stock": 4.0}}"#)
                .unwrap();
        let entry = item.into_entry(SelectionKind::Cart);
        assert_eq!(entry.quantity, 2);
        assert_eq!(entry.snapshot.unwrap().stock, 4);
    }

    #[test]
    fn test_fractional_or_negative_counts() {
        let fractional: Product = serde_json::from_str(r#"{"id": 3, "stock": 2.5}"#).unwrap();
        assert_eq!(fractional.stock, 0);

        let negative: Product = serde_json::from_str(r#"{"id": 3, "stock": -4.0}"#).unwrap();
        assert_eq!(negative.stock, 0);

        let huge: Product = serde_json::from_str(r#"{"id": 3, "stock": 1e12}"#).unwrap();
        assert_eq!(huge.stock, 0);
    }

    #[test]
    fn test_selection_item_into_entry() {
        let item: SelectionItem = serde_json::from_str(
            r#"{"id": 90, "quantity": 3, "product": {"id": 7, "price": 20, "stock": 4, "discountPercentage": 5}}"#,
        )
        .unwrap();

        let entry = item.clone().into_entry(SelectionKind::Cart);
        assert_eq!(entry.product_id, ProductId::new(7));
        assert_eq!(entry.quantity, 3);
        let snapshot = entry.snapshot.unwrap();
        assert_eq!(snapshot.stock, 4);
        assert_eq!(snapshot.price, Price::from_cents(2000));

        let wish = item.into_entry(SelectionKind::Wishlist);
        assert!(wish.snapshot.is_none());
    }

    #[test]
    fn test_selection_item_quantity_defaults_to_one() {
        let item: SelectionItem = serde_json::from_str(r#"{"product": {"id": 2}}"#).unwrap();
        assert_eq!(item.into_entry(SelectionKind::Cart).quantity, 1);

        let zero: SelectionItem =
            serde_json::from_str(r#"{"quantity": 0, "product": {"id": 2}}"#).unwrap();
        assert_eq!(zero.into_entry(SelectionKind::Cart).quantity, 1);
    }

    #[test]
    fn test_selection_write_body() {
        let body = SelectionWrite {
            product_id: ProductId::new(7),
            user_id: Some(UserId::new(3)),
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"productId":7,"userId":3}"#
        );
    }

    #[test]
    fn test_login_payload_uses_token() {
        let payload: Envelope<AuthPayload> = serde_json::from_str(
            r#"{"data":{"user":{"id":4,"name":"Mona","email":"m@x.io","phone":"01012345678","age":30,"role":"manager","token":"tok-1"}}}"#,
        )
        .unwrap();
        let user = AuthUser::from(payload.into_inner().user);
        assert_eq!(user.token.expose_secret(), "tok-1");
        assert_eq!(user.profile.role, Role::Manager);
        assert_eq!(user.profile.age.as_deref(), Some("30"));
    }

    #[test]
    fn test_signup_payload_uses_access_token() {
        let payload: Envelope<AuthPayload> = serde_json::from_str(
            r#"{"data":{"user":{"id":9,"firstname":"Omar","lastname":"Ali","accessToken":"tok-2"}}}"#,
        )
        .unwrap();
        let user = AuthUser::from(payload.into_inner().user);
        assert_eq!(user.token.expose_secret(), "tok-2");
        assert_eq!(user.profile.role, Role::User);
        assert_eq!(user.profile.display_name(), "Omar Ali");
    }

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(Path::new("a/b.PNG")), "image/png");
        assert_eq!(mime_for_path(Path::new("photo.jpeg")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("noext")), "application/octet-stream");
    }
}
