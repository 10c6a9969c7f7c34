//! Form input and per-field validation.
//!
//! Every form validates all of its fields before reporting, so callers can
//! show each message inline next to its field. Validation is a courtesy:
//! the API re-checks everything and its messages win.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use marigold_core::{Email, Role};
use regex::Regex;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use crate::api::ImageUpload;

/// Local phone numbers: mobile (01 + 9 digits) or Cairo landline (02 + 7 digits).
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(01[0-9]{9}|02[0-9]{7})$").expect("Invalid regex"));

const MIN_AGE: u32 = 18;
const MAX_AGE: u32 = 100;
const MIN_PASSWORD_LEN: usize = 8;
const MIN_STAFF_PASSWORD_LEN: usize = 6;

/// Text fields of the product management form, in submission order.
pub const PRODUCT_FIELDS: [&str; 21] = [
    "title",
    "description",
    "category",
    "price",
    "discountPercentage",
    "rating",
    "stock",
    "tags",
    "brand",
    "sku",
    "weight",
    "width",
    "height",
    "depth",
    "warrantyInformation",
    "shippingInformation",
    "availabilityStatus",
    "returnPolicy",
    "minimumOrderQuantity",
    "barcode",
    "qrCode",
];

// =============================================================================
// FieldErrors
// =============================================================================

/// Validation failures keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    /// No errors yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error, keeping the first message per field.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    /// Message recorded for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Field and message pairs in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }

    /// `Ok` when nothing was recorded.
    ///
    /// # Errors
    ///
    /// Returns `self` if any field failed.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

impl std::error::Error for FieldErrors {}

// =============================================================================
// Field rules
// =============================================================================

fn check_email(errors: &mut FieldErrors, value: &str) {
    if value.trim().is_empty() {
        errors.add("email", "Email is required");
    } else if Email::parse(value.trim()).is_err() {
        errors.add("email", "Invalid email");
    }
}

fn check_password(errors: &mut FieldErrors, value: &SecretString, min: usize) {
    let len = value.expose_secret().chars().count();
    if len == 0 {
        errors.add("password", "Password is required");
    } else if len < min {
        errors.add(
            "password",
            format!("Password must be at least {min} characters"),
        );
    }
}

fn check_name(errors: &mut FieldErrors, field: &'static str, label: &str, value: &str, max: usize) {
    let len = value.trim().chars().count();
    if len == 0 {
        errors.add(field, format!("{label} is required"));
    } else if len < 3 {
        errors.add(field, format!("{label} must be at least 3 characters"));
    } else if len > max {
        errors.add(field, format!("{label} must be at most {max} characters"));
    }
}

fn check_age(errors: &mut FieldErrors, value: &str) {
    if value.trim().is_empty() {
        errors.add("age", "Age is required");
        return;
    }
    match value.trim().parse::<u32>() {
        Ok(age) if (MIN_AGE..=MAX_AGE).contains(&age) => {}
        Ok(_) => errors.add("age", format!("Age must be between {MIN_AGE} and {MAX_AGE}")),
        Err(_) => errors.add("age", "Age must be a number"),
    }
}

fn check_phone(errors: &mut FieldErrors, value: &str) {
    if value.trim().is_empty() {
        errors.add("phone", "Phone is required");
    } else if !PHONE_RE.is_match(value.trim()) {
        errors.add("phone", "Invalid phone number");
    }
}

// =============================================================================
// Login
// =============================================================================

/// Email and password login.
#[derive(Debug, Clone)]
pub struct LoginForm {
    pub email: String,
    pub password: SecretString,
}

impl LoginForm {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        check_email(&mut errors, &self.email);
        check_password(&mut errors, &self.password, MIN_PASSWORD_LEN);
        errors.into_result()
    }

    pub(crate) fn to_body(&self) -> serde_json::Value {
        json!({
            "email": self.email.trim(),
            "password": self.password.expose_secret(),
        })
    }
}

// =============================================================================
// Signup and user management
// =============================================================================

/// Self-service account creation.
#[derive(Debug, Clone)]
pub struct SignupForm {
    pub firstname: String,
    pub lastname: String,
    pub age: String,
    pub email: String,
    pub phone: String,
    pub password: SecretString,
}

impl SignupForm {
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        self.check_details(&mut errors, 15);
        check_password(&mut errors, &self.password, MIN_PASSWORD_LEN);
        errors.into_result()
    }

    fn check_details(&self, errors: &mut FieldErrors, max_name: usize) {
        check_name(errors, "firstname", "First name", &self.firstname, max_name);
        check_name(errors, "lastname", "Last name", &self.lastname, max_name);
        check_age(errors, &self.age);
        check_email(errors, &self.email);
        check_phone(errors, &self.phone);
    }

    pub(crate) fn to_body(&self) -> serde_json::Value {
        json!({
            "firstname": self.firstname.trim(),
            "lastname": self.lastname.trim(),
            "age": self.age.trim(),
            "email": self.email.trim(),
            "phone": self.phone.trim(),
            "password": self.password.expose_secret(),
        })
    }
}

/// Account creation from the admin and manager screens.
///
/// Looser name and password limits than self-service signup, and a role.
#[derive(Debug, Clone)]
pub struct NewUserForm {
    pub details: SignupForm,
    pub role: Option<Role>,
}

impl NewUserForm {
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        self.details.check_details(&mut errors, 20);
        check_password(&mut errors, &self.details.password, MIN_STAFF_PASSWORD_LEN);
        if self.role.is_none() {
            errors.add("role", "Role is required");
        }
        errors.into_result()
    }

    pub(crate) fn to_body(&self) -> serde_json::Value {
        let mut body = self.details.to_body();
        if let (Some(object), Some(role)) = (body.as_object_mut(), self.role) {
            object.insert("role".to_string(), json!(role.as_str()));
        }
        body
    }
}

/// Edit of an existing user's profile fields.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub firstname: String,
    pub lastname: String,
    pub age: String,
    pub email: String,
    pub phone: String,
}

impl UserUpdate {
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        check_name(&mut errors, "firstname", "First name", &self.firstname, 15);
        check_name(&mut errors, "lastname", "Last name", &self.lastname, 15);
        check_age(&mut errors, &self.age);
        check_email(&mut errors, &self.email);
        check_phone(&mut errors, &self.phone);
        errors.into_result()
    }

    pub(crate) fn to_body(&self) -> serde_json::Value {
        json!({
            "firstname": self.firstname.trim(),
            "lastname": self.lastname.trim(),
            "age": self.age.trim(),
            "email": self.email.trim(),
            "phone": self.phone.trim(),
        })
    }
}

// =============================================================================
// Products
// =============================================================================

/// Multipart product create/update form.
#[derive(Debug, Clone, Default)]
pub struct ProductForm {
    fields: BTreeMap<&'static str, String>,
    pub thumbnail: Option<ImageUpload>,
    pub images: Vec<ImageUpload>,
    /// Image paths to keep on update.
    pub existing_images: Vec<String>,
}

impl ProductForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a text field.
    ///
    /// # Errors
    ///
    /// Returns the name back if it is not one of [`PRODUCT_FIELDS`].
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Result<(), String> {
        let field = PRODUCT_FIELDS
            .iter()
            .find(|known| **known == name)
            .ok_or_else(|| name.to_owned())?;
        self.fields.insert(field, value.into());
        Ok(())
    }

    /// Value of a text field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Text fields in submission order, blanks included as empty strings.
    pub fn text_fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        PRODUCT_FIELDS
            .iter()
            .map(|name| (*name, self.fields.get(name).map_or("", String::as_str)))
    }

    /// Validate for creation: title required, numbers well-formed.
    ///
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.get("title").is_none_or(|t| t.trim().is_empty()) {
            errors.add("title", "Title is required");
        }
        self.check_numbers(&mut errors);
        errors.into_result()
    }

    /// Validate for update: only fields that are present are checked.
    ///
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate_update(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.get("title").is_some_and(|t| t.trim().is_empty()) {
            errors.add("title", "Title cannot be blank");
        }
        self.check_numbers(&mut errors);
        errors.into_result()
    }

    fn check_numbers(&self, errors: &mut FieldErrors) {
        if let Some(price) = self.present("price") {
            match price.parse::<Decimal>() {
                Ok(p) if p >= Decimal::ZERO => {}
                _ => errors.add("price", "Price must be a non-negative number"),
            }
        }
        if let Some(stock) = self.present("stock")
            && stock.parse::<u32>().is_err()
        {
            errors.add("stock", "Stock must be a whole number");
        }
        if let Some(discount) = self.present("discountPercentage") {
            match discount.parse::<Decimal>() {
                Ok(d) if d >= Decimal::ZERO && d <= Decimal::ONE_HUNDRED => {}
                _ => errors.add("discountPercentage", "Discount must be between 0 and 100"),
            }
        }
    }

    fn present(&self, name: &str) -> Option<&str> {
        self.get(name).map(str::trim).filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn signup() -> SignupForm {
        SignupForm {
            firstname: "Mona".to_string(),
            lastname: "Hassan".to_string(),
            age: "29".to_string(),
            email: "mona@example.com".to_string(),
            phone: "01012345678".to_string(),
            password: SecretString::from("hunter2hunter2"),
        }
    }

    #[test]
    fn test_login_valid() {
        assert!(LoginForm::new("a@b.co", "longenough").validate().is_ok());
    }

    #[test]
    fn test_login_reports_every_field() {
        let errors = LoginForm::new("not-an-email", "short").validate().unwrap_err();
        assert_eq!(errors.get("email"), Some("Invalid email"));
        assert_eq!(errors.get("password"), Some("Password must be at least 8 characters"));
    }

    #[test]
    fn test_login_required() {
        let errors = LoginForm::new("", "").validate().unwrap_err();
        assert_eq!(errors.get("email"), Some("Email is required"));
        assert_eq!(errors.get("password"), Some("Password is required"));
    }

    #[test]
    fn test_signup_valid() {
        assert!(signup().validate().is_ok());
    }

    #[test]
    fn test_signup_rules() {
        let form = SignupForm {
            firstname: "Al".to_string(),
            lastname: "A".repeat(16),
            age: "17".to_string(),
            phone: "0301234567".to_string(),
            ..signup()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.get("firstname").is_some());
        assert!(errors.get("lastname").is_some());
        assert_eq!(errors.get("age"), Some("Age must be between 18 and 100"));
        assert_eq!(errors.get("phone"), Some("Invalid phone number"));
    }

    #[test]
    fn test_phone_patterns() {
        for phone in ["01012345678", "0212345678"] {
            let form = SignupForm {
                phone: phone.to_string(),
                ..signup()
            };
            assert!(form.validate().is_ok(), "{phone}");
        }
        for phone in ["0101234567", "021234567", "+201012345678", "abc"] {
            let form = SignupForm {
                phone: phone.to_string(),
                ..signup()
            };
            assert!(form.validate().is_err(), "{phone}");
        }
    }

    #[test]
    fn test_new_user_needs_role_and_allows_short_password() {
        let mut form = NewUserForm {
            details: SignupForm {
                firstname: "A".repeat(18),
                password: SecretString::from("six666"),
                ..signup()
            },
            role: None,
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("role"), Some("Role is required"));

        form.role = Some(Role::Manager);
        assert!(form.validate().is_ok());
        assert_eq!(form.to_body()["role"], "manager");
    }

    #[test]
    fn test_user_update_rules() {
        let update = UserUpdate {
            firstname: "Mona".to_string(),
            lastname: "Hassan".to_string(),
            age: "abc".to_string(),
            email: "mona@example.com".to_string(),
            phone: "01012345678".to_string(),
        };
        let errors = update.validate().unwrap_err();
        assert_eq!(errors.get("age"), Some("Age must be a number"));
    }

    #[test]
    fn test_product_form_fields() {
        let mut form = ProductForm::new();
        form.set("title", "Lamp").unwrap();
        form.set("price", "19.5").unwrap();
        assert_eq!(form.set("colour", "red").unwrap_err(), "colour");

        let fields: Vec<_> = form.text_fields().collect();
        assert_eq!(fields.len(), PRODUCT_FIELDS.len());
        assert_eq!(fields[0], ("title", "Lamp"));
        assert_eq!(fields[3], ("price", "19.5"));
        assert_eq!(fields[1], ("description", ""));
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_product_form_number_rules() {
        let mut form = ProductForm::new();
        form.set("price", "-1").unwrap();
        form.set("stock", "2.5").unwrap();
        form.set("discountPercentage", "120").unwrap();
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.len(), 4);
        assert_eq!(errors.get("title"), Some("Title is required"));

        // Updates may omit the title entirely
        let mut update = ProductForm::new();
        update.set("stock", "4").unwrap();
        assert!(update.validate_update().is_ok());
    }

    #[test]
    fn test_field_errors_display() {
        let mut errors = FieldErrors::new();
        errors.add("phone", "Invalid phone number");
        errors.add("age", "Age is required");
        errors.add("age", "ignored");
        assert_eq!(errors.to_string(), "age: Age is required; phone: Invalid phone number");
    }
}
