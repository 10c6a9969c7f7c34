//! User and product management with admin and shopper tokens.

#![allow(clippy::unwrap_used)]

use marigold_core::{ProductId, Role, UserId};
use marigold_integration_tests::{ADMIN, FakeApi, SHOPPER};
use marigold_storefront::api::{ApiError, ImageUpload};
use marigold_storefront::forms::{LoginForm, NewUserForm, ProductForm, SignupForm, UserUpdate};
use marigold_storefront::state::AppState;
use secrecy::SecretString;

async fn as_user(api: &FakeApi, (email, password): (&str, &str)) -> (AppState, SecretString) {
    let state = api.app_state();
    state
        .session()
        .login(state.api(), &LoginForm::new(email, password))
        .await
        .unwrap();
    let token = state.session().token().unwrap();
    (state, token)
}

fn png(name: &str) -> ImageUpload {
    ImageUpload {
        file_name: name.to_string(),
        mime: "image/png",
        bytes: vec![0x89, b'P', b'N', b'G'],
    }
}

// =============================================================================
// Users
// =============================================================================

#[tokio::test]
async fn test_admin_lists_and_creates_users() {
    let api = FakeApi::spawn().await;
    let (state, token) = as_user(&api, ADMIN).await;

    let form = NewUserForm {
        details: SignupForm {
            firstname: "Karim".to_string(),
            lastname: "Fathy".to_string(),
            age: "35".to_string(),
            email: "karim@marigold.test".to_string(),
            phone: "01234567890".to_string(),
            password: SecretString::from("secret1"),
        },
        role: Some(Role::Manager),
    };
    form.validate().unwrap();

    let created = state.api().create_user(&token, &form).await.unwrap();
    assert_eq!(created.display_name(), "Karim Fathy");
    assert_eq!(created.role, Role::Manager);
    assert_eq!(api.role_of("karim@marigold.test").as_deref(), Some("manager"));

    let users = state.api().users(&token).await.unwrap();
    assert_eq!(users.len(), 3);
    assert!(users.iter().any(|u| u.email.as_deref() == Some(SHOPPER.0)));
}

#[tokio::test]
async fn test_admin_updates_and_deletes_users() {
    let api = FakeApi::spawn().await;
    let (state, token) = as_user(&api, ADMIN).await;

    let update = UserUpdate {
        firstname: "Mona".to_string(),
        lastname: "Saleh".to_string(),
        age: "30".to_string(),
        email: SHOPPER.0.to_string(),
        phone: "01099998888".to_string(),
    };
    update.validate().unwrap();
    state.api().update_user(&token, UserId::new(2), &update).await.unwrap();

    let users = state.api().users(&token).await.unwrap();
    let mona = users.iter().find(|u| u.id == UserId::new(2)).unwrap();
    assert_eq!(mona.display_name(), "Mona Saleh");
    assert_eq!(mona.age.as_deref(), Some("30"));

    state.api().delete_user(&token, UserId::new(2)).await.unwrap();
    let users = state.api().users(&token).await.unwrap();
    assert_eq!(users.len(), 1);

    let err = state.api().delete_user(&token, UserId::new(2)).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_shopper_is_refused_by_the_api() {
    let api = FakeApi::spawn().await;
    let (state, token) = as_user(&api, SHOPPER).await;

    let err = state.api().users(&token).await.unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert_eq!(err.user_message(), "Access denied");
}

#[tokio::test]
async fn test_anonymous_management_calls_never_leave_the_client() {
    let api = FakeApi::spawn().await;
    let state = api.app_state();

    let err = state
        .api()
        .users(&SecretString::from(String::new()))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Unauthenticated));
    assert!(api.requests().is_empty());
}

// =============================================================================
// Products
// =============================================================================

#[tokio::test]
async fn test_added_product_appears_in_the_catalog() {
    let api = FakeApi::spawn().await;
    let (state, token) = as_user(&api, ADMIN).await;

    // Warm the cache so the add has something to invalidate
    assert_eq!(state.api().products().await.unwrap().len(), 5);

    let mut form = ProductForm::new();
    form.set("title", "Desk Lamp").unwrap();
    form.set("category", "furniture").unwrap();
    form.set("price", "24.50").unwrap();
    form.set("stock", "12").unwrap();
    form.set("tags", "lighting, desk").unwrap();
    form.thumbnail = Some(png("lamp.png"));
    form.images = vec![png("lamp-1.png"), png("lamp-2.png")];
    form.validate().unwrap();

    state.api().add_product(&token, &form).await.unwrap();

    let products = state.api().products().await.unwrap();
    assert_eq!(products.len(), 6);
    let lamp = products.iter().find(|p| p.title == "Desk Lamp").unwrap();
    assert_eq!(lamp.stock, 12);
    assert_eq!(lamp.tags, vec!["lighting", "desk"]);
    assert_eq!(lamp.thumbnail.as_deref(), Some("/uploads/lamp.png"));
    assert_eq!(lamp.images.len(), 2);
    assert_eq!(api.count("GET", "/products"), 2);
}

#[tokio::test]
async fn test_update_keeps_listed_images_and_untouched_fields() {
    let api = FakeApi::spawn().await;
    let (state, token) = as_user(&api, ADMIN).await;
    let id = ProductId::new(1);
    assert_eq!(state.api().product(id).await.unwrap().stock, 5);

    let mut form = ProductForm::new();
    form.set("stock", "40").unwrap();
    form.set("title", "").unwrap();
    form.existing_images = vec!["/uploads/mascara-1.png".to_string()];
    form.images = vec![png("mascara-2.png")];
    assert!(form.validate_update().is_err());

    let mut form = ProductForm::new();
    form.set("stock", "40").unwrap();
    form.existing_images = vec!["/uploads/mascara-1.png".to_string()];
    form.images = vec![png("mascara-2.png")];
    form.validate_update().unwrap();
    state.api().update_product(&token, id, &form).await.unwrap();

    let product = state.api().product(id).await.unwrap();
    assert_eq!(product.stock, 40);
    assert_eq!(product.title, "Essence Mascara Lash Princess");
    assert_eq!(
        product.images,
        vec!["/uploads/mascara-1.png", "/uploads/mascara-2.png"]
    );
}

#[tokio::test]
async fn test_deleted_product_is_gone() {
    let api = FakeApi::spawn().await;
    let (state, token) = as_user(&api, ADMIN).await;
    let id = ProductId::new(42);
    state.api().product(id).await.unwrap();

    state.api().delete_product(&token, id).await.unwrap();

    assert!(api.product(42).is_none());
    let err = state.api().product(id).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn test_shopper_cannot_add_products() {
    let api = FakeApi::spawn().await;
    let (state, token) = as_user(&api, SHOPPER).await;

    let mut form = ProductForm::new();
    form.set("title", "Contraband").unwrap();
    let err = state.api().add_product(&token, &form).await.unwrap_err();

    assert_eq!(err.status(), Some(403));
    assert!(api.product_id_by_title("Contraband").is_none());
}
