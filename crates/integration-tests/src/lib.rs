//! Integration tests for Marigold.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p marigold-integration-tests
//! ```
//!
//! Nothing external is needed: every test starts its own [`FakeApi`], an
//! in-process `axum` server on an ephemeral port that speaks the storefront
//! API's conventions (`{ "data": ... }` envelopes, bearer tokens, multipart
//! product forms) over in-memory data.
//!
//! ```rust,ignore
//! let api = FakeApi::spawn().await;
//! let state = api.app_state();
//! let products = state.api().products().await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Multipart, Path, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::Next;
use axum::response::Response;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use marigold_storefront::config::{ApiConfig, ClientConfig};
use marigold_storefront::events::EventBus;
use marigold_storefront::state::AppState;
use marigold_storefront::storage::MemoryStore;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use url::Url;

/// Email and password of the seeded admin.
pub const ADMIN: (&str, &str) = ("admin@marigold.test", "adminpass1");
/// Email and password of the seeded shopper.
pub const SHOPPER: (&str, &str) = ("mona@marigold.test", "hunter2hunter2");

type Reply = (StatusCode, Json<Value>);

fn ok(data: Value) -> Reply {
    (StatusCode::OK, Json(json!({ "data": data })))
}

fn fail(status: StatusCode, message: &str) -> Reply {
    (status, Json(json!({ "message": message })))
}

// =============================================================================
// State
// =============================================================================

/// A request as the fake API saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub request_id: Option<String>,
}

#[derive(Debug, Clone)]
struct FakeUser {
    id: i32,
    firstname: String,
    lastname: String,
    email: String,
    password: String,
    phone: String,
    age: String,
    role: String,
}

impl FakeUser {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "firstname": self.firstname,
            "lastname": self.lastname,
            "email": self.email,
            "phone": self.phone,
            "age": self.age,
            "role": self.role,
        })
    }
}

#[derive(Debug, Default)]
struct FakeState {
    products: Vec<Value>,
    users: Vec<FakeUser>,
    tokens: BTreeMap<String, i32>,
    baskets: BTreeMap<i32, Vec<i32>>,
    wishlists: BTreeMap<i32, Vec<i32>>,
    fail_selection_writes: bool,
    fail_selection_reads: bool,
    requests: Vec<Recorded>,
    next_id: i32,
}

impl FakeState {
    fn seeded() -> Self {
        let products = vec![
            json!({"id": 1, "title": "Essence Mascara Lash Princess", "category": "beauty",
                   "price": 9.99, "discountPercentage": 10, "rating": 4.9, "stock": 5,
                   "thumbnail": "/uploads/mascara.png", "images": ["/uploads/mascara-1.png"]}),
            json!({"id": 2, "title": "Eyeshadow Palette with Mirror", "category": "beauty",
                   "price": "19.99", "discountPercentage": 0, "rating": 3.3, "stock": 44}),
            json!({"id": 3, "title": "Annibale Colombo Bed", "category": "furniture",
                   "price": 1899.99, "discountPercentage": 5, "rating": 4.1, "stock": 0}),
            json!({"id": 7, "title": "Apple", "category": "groceries",
                   "price": 1.99, "discountPercentage": 0, "rating": 4.2, "stock": 9}),
            json!({"id": 42, "title": "Cooking Oil", "category": "groceries",
                   "price": 4.99, "discountPercentage": 0, "rating": 4.0, "stock": 22}),
        ];
        let users = vec![
            FakeUser {
                id: 1,
                firstname: "Amal".to_string(),
                lastname: "Nasser".to_string(),
                email: ADMIN.0.to_string(),
                password: ADMIN.1.to_string(),
                phone: "01000000001".to_string(),
                age: "41".to_string(),
                role: "admin".to_string(),
            },
            FakeUser {
                id: 2,
                firstname: "Mona".to_string(),
                lastname: "Hassan".to_string(),
                email: SHOPPER.0.to_string(),
                password: SHOPPER.1.to_string(),
                phone: "01012345678".to_string(),
                age: "29".to_string(),
                role: "user".to_string(),
            },
        ];
        Self {
            products,
            users,
            next_id: 100,
            ..Self::default()
        }
    }

    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn issue_token(&mut self, user_id: i32) -> String {
        let token = format!("token-{user_id}-{}", uuid::Uuid::new_v4());
        self.tokens.insert(token.clone(), user_id);
        token
    }

    fn product(&self, id: i32) -> Option<&Value> {
        self.products.iter().find(|p| p["id"] == id)
    }

    fn user(&self, id: i32) -> Option<&FakeUser> {
        self.users.iter().find(|u| u.id == id)
    }

    fn selections(&mut self, path: &str, user_id: i32) -> &mut Vec<i32> {
        let sets = if path == "basket" {
            &mut self.baskets
        } else {
            &mut self.wishlists
        };
        sets.entry(user_id).or_default()
    }
}

type Shared = Arc<Mutex<FakeState>>;

fn lock(state: &Shared) -> MutexGuard<'_, FakeState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// The caller's user, or a 401 reply.
fn caller(state: &FakeState, headers: &HeaderMap) -> Result<FakeUser, Reply> {
    bearer(headers)
        .and_then(|token| state.tokens.get(token))
        .and_then(|id| state.user(*id))
        .cloned()
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Unauthorized"))
}

/// The caller's user if they are staff, or a 401/403 reply.
fn staff(state: &FakeState, headers: &HeaderMap) -> Result<FakeUser, Reply> {
    let user = caller(state, headers)?;
    if user.role == "admin" || user.role == "manager" {
        Ok(user)
    } else {
        Err(fail(StatusCode::FORBIDDEN, "Access denied"))
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn record(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let recorded = Recorded {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        request_id: request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from),
    };
    lock(&state).requests.push(recorded);
    next.run(request).await
}

async fn list_products(State(state): State<Shared>) -> Reply {
    ok(Value::Array(lock(&state).products.clone()))
}

async fn products_in_category(State(state): State<Shared>, Path(category): Path<String>) -> Reply {
    let state = lock(&state);
    let matching: Vec<Value> = state
        .products
        .iter()
        .filter(|p| p["category"] == category.as_str())
        .cloned()
        .collect();
    ok(Value::Array(matching))
}

async fn product_by_id(State(state): State<Shared>, Path(id): Path<i32>) -> Reply {
    lock(&state)
        .product(id)
        .cloned()
        .map_or_else(|| fail(StatusCode::NOT_FOUND, "Product not found"), ok)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SelectionBody {
    product_id: i32,
}

async fn list_selections(
    State(state): State<Shared>,
    headers: HeaderMap,
    path: &'static str,
) -> Reply {
    let mut state = lock(&state);
    let user = match caller(&state, &headers) {
        Ok(user) => user,
        Err(reply) => return reply,
    };
    if state.fail_selection_reads {
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "Database unavailable");
    }
    let ids = state.selections(path, user.id).clone();
    let items: Vec<Value> = ids
        .iter()
        .enumerate()
        .filter_map(|(n, id)| {
            state
                .product(*id)
                .map(|product| json!({ "id": n + 1, "quantity": 1, "product": product }))
        })
        .collect();
    ok(Value::Array(items))
}

async fn change_selection(
    State(state): State<Shared>,
    headers: HeaderMap,
    path: &'static str,
    body: SelectionBody,
    add: bool,
) -> Reply {
    let mut state = lock(&state);
    let user = match caller(&state, &headers) {
        Ok(user) => user,
        Err(reply) => return reply,
    };
    if state.fail_selection_writes {
        return fail(StatusCode::INTERNAL_SERVER_ERROR, &format!("Could not update {path}"));
    }
    if state.product(body.product_id).is_none() {
        return fail(StatusCode::NOT_FOUND, "Product not found");
    }
    let ids = state.selections(path, user.id);
    if add {
        if ids.contains(&body.product_id) {
            return fail(StatusCode::CONFLICT, "Product already added");
        }
        ids.push(body.product_id);
    } else {
        ids.retain(|id| *id != body.product_id);
    }
    ok(json!({ "productId": body.product_id }))
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

async fn login(State(state): State<Shared>, Json(body): Json<LoginBody>) -> Reply {
    let mut state = lock(&state);
    let Some(user) = state
        .users
        .iter()
        .find(|u| u.email == body.email && u.password == body.password)
        .cloned()
    else {
        return fail(StatusCode::UNAUTHORIZED, "Invalid email or password");
    };
    let token = state.issue_token(user.id);
    let mut profile = user.to_json();
    profile["token"] = json!(token);
    profile["name"] = json!(format!("{} {}", user.firstname, user.lastname));
    ok(json!({ "user": profile }))
}

#[derive(Deserialize)]
struct SignupBody {
    firstname: String,
    lastname: String,
    email: String,
    password: String,
    phone: String,
    age: String,
    role: Option<String>,
}

async fn signup(State(state): State<Shared>, Json(body): Json<SignupBody>) -> Reply {
    let mut state = lock(&state);
    if state.users.iter().any(|u| u.email == body.email) {
        return fail(StatusCode::CONFLICT, "Email already exists");
    }
    let user = FakeUser {
        id: state.next_id(),
        firstname: body.firstname,
        lastname: body.lastname,
        email: body.email,
        password: body.password,
        phone: body.phone,
        age: body.age,
        role: body.role.unwrap_or_else(|| "user".to_string()),
    };
    state.users.push(user.clone());
    let token = state.issue_token(user.id);
    let mut profile = user.to_json();
    profile["accessToken"] = json!(token);
    (StatusCode::CREATED, Json(json!({ "data": { "user": profile } })))
}

async fn list_users(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let state = lock(&state);
    if let Err(reply) = staff(&state, &headers) {
        return reply;
    }
    ok(state.users.iter().map(FakeUser::to_json).collect())
}

#[derive(Deserialize)]
struct UserUpdateBody {
    firstname: String,
    lastname: String,
    email: String,
    phone: String,
    age: String,
}

async fn update_user(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Json(body): Json<UserUpdateBody>,
) -> Reply {
    let mut state = lock(&state);
    if let Err(reply) = staff(&state, &headers) {
        return reply;
    }
    let Some(user) = state.users.iter_mut().find(|u| u.id == id) else {
        return fail(StatusCode::NOT_FOUND, "User not found");
    };
    user.firstname = body.firstname;
    user.lastname = body.lastname;
    user.email = body.email;
    user.phone = body.phone;
    user.age = body.age;
    ok(user.to_json())
}

async fn delete_user(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<i32>) -> Reply {
    let mut state = lock(&state);
    if let Err(reply) = staff(&state, &headers) {
        return reply;
    }
    let before = state.users.len();
    state.users.retain(|u| u.id != id);
    if state.users.len() == before {
        return fail(StatusCode::NOT_FOUND, "User not found");
    }
    ok(json!({ "id": id }))
}

/// Text fields and uploaded file names of a multipart product form.
#[derive(Default)]
struct ProductUpload {
    fields: BTreeMap<String, String>,
    thumbnail: Option<String>,
    images: Vec<String>,
}

async fn read_upload(mut multipart: Multipart) -> Result<ProductUpload, Reply> {
    let bad = |e: axum::extract::multipart::MultipartError| {
        fail(StatusCode::BAD_REQUEST, &format!("Bad multipart body: {e}"))
    };
    let mut upload = ProductUpload::default();
    while let Some(field) = multipart.next_field().await.map_err(bad)? {
        let name = field.name().unwrap_or_default().to_string();
        if let Some(file_name) = field.file_name().map(String::from) {
            field.bytes().await.map_err(bad)?;
            let stored = format!("/uploads/{file_name}");
            if name == "thumbnail" {
                upload.thumbnail = Some(stored);
            } else {
                upload.images.push(stored);
            }
        } else {
            let value = field.text().await.map_err(bad)?;
            upload.fields.insert(name, value);
        }
    }
    Ok(upload)
}

fn apply_fields(product: &mut Value, fields: &BTreeMap<String, String>) {
    for (name, value) in fields {
        if name == "existingImages" || value.trim().is_empty() {
            continue;
        }
        if name == "tags" {
            let tags: Vec<&str> = value.split(',').map(str::trim).collect();
            product["tags"] = json!(tags);
            continue;
        }
        product[name.as_str()] = if name == "title" || name == "sku" {
            json!(value)
        } else if let Ok(n) = value.trim().parse::<i64>() {
            json!(n)
        } else if let Ok(n) = value.trim().parse::<f64>() {
            json!(n)
        } else {
            json!(value)
        };
    }
}

async fn add_product(State(state): State<Shared>, headers: HeaderMap, multipart: Multipart) -> Reply {
    // Read the body before refusing so the client sees the status
    let upload = match read_upload(multipart).await {
        Ok(upload) => upload,
        Err(reply) => return reply,
    };
    if let Err(reply) = staff(&lock(&state), &headers) {
        return reply;
    }
    if upload.fields.get("title").is_none_or(|t| t.trim().is_empty()) {
        return fail(StatusCode::BAD_REQUEST, "Title is required");
    }

    let mut state = lock(&state);
    let mut product = json!({ "id": state.next_id() });
    apply_fields(&mut product, &upload.fields);
    product["thumbnail"] = json!(upload.thumbnail);
    product["images"] = json!(upload.images);
    state.products.push(product.clone());
    (StatusCode::CREATED, Json(json!({ "data": product })))
}

async fn update_product(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Reply {
    let upload = match read_upload(multipart).await {
        Ok(upload) => upload,
        Err(reply) => return reply,
    };
    if let Err(reply) = staff(&lock(&state), &headers) {
        return reply;
    }
    let kept: Vec<String> = upload
        .fields
        .get("existingImages")
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or_default();

    let mut state = lock(&state);
    let Some(product) = state.products.iter_mut().find(|p| p["id"] == id) else {
        return fail(StatusCode::NOT_FOUND, "Product not found");
    };
    apply_fields(product, &upload.fields);
    if let Some(thumbnail) = upload.thumbnail {
        product["thumbnail"] = json!(thumbnail);
    }
    let mut images = kept;
    images.extend(upload.images);
    product["images"] = json!(images);
    ok(product.clone())
}

#[derive(Deserialize)]
struct DeleteProductBody {
    id: i32,
}

async fn delete_product(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<DeleteProductBody>,
) -> Reply {
    let mut state = lock(&state);
    if let Err(reply) = staff(&state, &headers) {
        return reply;
    }
    let before = state.products.len();
    state.products.retain(|p| p["id"] != body.id);
    if state.products.len() == before {
        return fail(StatusCode::NOT_FOUND, "Product not found");
    }
    ok(json!({ "id": body.id }))
}

fn router(state: Shared) -> Router {
    let selection_routes = |path: &'static str| {
        get(move |s: State<Shared>, h: HeaderMap| list_selections(s, h, path))
            .post(move |s: State<Shared>, h: HeaderMap, Json(b): Json<SelectionBody>| {
                change_selection(s, h, path, b, true)
            })
            .delete(move |s: State<Shared>, h: HeaderMap, Json(b): Json<SelectionBody>| {
                change_selection(s, h, path, b, false)
            })
    };

    Router::new()
        .route("/products", get(list_products))
        .route("/products/category/{category}", get(products_in_category))
        .route("/products/id/{id}", get(product_by_id))
        .route("/products/addProduct", post(add_product))
        .route("/products/deleteProduct", delete(delete_product))
        .route("/products/{id}", put(update_product))
        .route("/basket", selection_routes("basket"))
        .route("/wishlist", selection_routes("wishlist"))
        .route("/auth/login", post(login))
        .route("/auth/signup", post(signup))
        .route("/users", get(list_users))
        .route("/users/{id}", put(update_user).delete(delete_user))
        .layer(axum::middleware::from_fn_with_state(state.clone(), record))
        .with_state(state)
}

// =============================================================================
// FakeApi
// =============================================================================

/// A running fake storefront API.
///
/// The server task is aborted when this is dropped.
pub struct FakeApi {
    base_url: Url,
    state: Shared,
    server: tokio::task::JoinHandle<()>,
}

impl Drop for FakeApi {
    fn drop(&mut self) {
        self.server.abort();
    }
}

impl FakeApi {
    /// Start a server with the seeded catalog and accounts.
    pub async fn spawn() -> Self {
        let state: Shared = Arc::new(Mutex::new(FakeState::seeded()));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake API");
        let addr = listener.local_addr().expect("Fake API has no address");
        let app = router(state.clone());

        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: Url::parse(&format!("http://{addr}")).expect("Invalid fake API URL"),
            state,
            server,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Client configuration pointing at this server.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            api: ApiConfig::new(self.base_url.clone()),
            storage_path: std::env::temp_dir()
                .join(format!("marigold-it-{}", uuid::Uuid::new_v4()))
                .join("storage.json"),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    /// Client state over a fresh in-memory store that announces its writes.
    #[must_use]
    pub fn app_state(&self) -> AppState {
        let bus = EventBus::new();
        let store = Arc::new(MemoryStore::with_events(bus.clone()));
        AppState::with_store(self.config(), store, bus).expect("Failed to build client state")
    }

    /// Make selection writes fail with a 500.
    pub fn fail_selection_writes(&self, fail: bool) {
        lock(&self.state).fail_selection_writes = fail;
    }

    /// Make selection reads fail with a 500.
    pub fn fail_selection_reads(&self, fail: bool) {
        lock(&self.state).fail_selection_reads = fail;
    }

    /// Product ids in a user's basket, in insertion order.
    #[must_use]
    pub fn basket(&self, user_id: i32) -> Vec<i32> {
        lock(&self.state).baskets.get(&user_id).cloned().unwrap_or_default()
    }

    /// Product ids in a user's wishlist, in insertion order.
    #[must_use]
    pub fn wishlist(&self, user_id: i32) -> Vec<i32> {
        lock(&self.state).wishlists.get(&user_id).cloned().unwrap_or_default()
    }

    /// Put a product straight into a user's basket.
    pub fn seed_basket(&self, user_id: i32, product_id: i32) {
        lock(&self.state).baskets.entry(user_id).or_default().push(product_id);
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<Recorded> {
        lock(&self.state).requests.clone()
    }

    /// How many `method path` requests were received.
    #[must_use]
    pub fn count(&self, method: &str, path: &str) -> usize {
        lock(&self.state)
            .requests
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    /// A product as stored by the server.
    #[must_use]
    pub fn product(&self, id: i32) -> Option<Value> {
        lock(&self.state).product(id).cloned()
    }

    /// Id of the product with `title`.
    #[must_use]
    pub fn product_id_by_title(&self, title: &str) -> Option<i32> {
        lock(&self.state)
            .products
            .iter()
            .find(|p| p["title"] == title)
            .and_then(|p| p["id"].as_i64())
            .and_then(|id| i32::try_from(id).ok())
    }

    /// Role of the user with `email`.
    #[must_use]
    pub fn role_of(&self, email: &str) -> Option<String> {
        lock(&self.state)
            .users
            .iter()
            .find(|u| u.email == email)
            .map(|u| u.role.clone())
    }
}
