//! REST client implementation.
//!
//! Uses `reqwest` 0.13 for HTTP. Catalog reads are cached with `moka`;
//! selections, accounts and admin writes never are.

mod admin;
mod cache;

use std::sync::Arc;

use async_trait::async_trait;
use marigold_core::{ProductId, SelectionKind, UserId};
use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::api::types::{
    AuthPayload, AuthUser, Envelope, Product, SelectionEntry, SelectionItem, SelectionWrite,
};
use crate::api::{ApiError, extract_error_message};
use crate::config::ApiConfig;
use crate::forms::{LoginForm, SignupForm};

use cache::{CacheKey, CacheValue};

/// Header carrying a per-request correlation id.
const REQUEST_ID_HEADER: &str = "X-Request-Id";

// =============================================================================
// RemoteSelections
// =============================================================================

/// Server-side cart and wishlist storage for a logged-in user.
///
/// Implemented by [`ApiClient`]; the selection store only sees this trait so
/// it can be exercised without a server.
#[async_trait]
pub trait RemoteSelections: Send + Sync {
    /// Current members of the `kind` set.
    async fn fetch(
        &self,
        kind: SelectionKind,
        token: &SecretString,
    ) -> Result<Vec<SelectionEntry>, ApiError>;

    /// Add `product_id` to the `kind` set.
    async fn add(
        &self,
        kind: SelectionKind,
        token: &SecretString,
        product_id: ProductId,
        user_id: Option<UserId>,
    ) -> Result<(), ApiError>;

    /// Remove `product_id` from the `kind` set.
    async fn remove(
        &self,
        kind: SelectionKind,
        token: &SecretString,
        product_id: ProductId,
        user_id: Option<UserId>,
    ) -> Result<(), ApiError>;
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the storefront REST API.
///
/// Cheap to clone; clones share the connection pool and catalog cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        // Relative joins need a trailing slash or they replace the last segment
        let mut base_url = config.base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client: builder.build()?,
                base_url,
                cache,
            }),
        })
    }

    /// Base URL every API path is resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Absolute URL for an image path returned by the API.
    ///
    /// Paths that are already absolute URLs pass through unchanged.
    #[must_use]
    pub fn asset_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_owned();
        }
        self.endpoint(path)
            .map_or_else(|_| path.to_owned(), |url| url.to_string())
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.inner
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidRequest(format!("bad path '{path}': {e}")))
    }

    /// Start a request with the correlation header set.
    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(path)?;
        Ok(self
            .inner
            .client
            .request(method, url)
            .header(REQUEST_ID_HEADER, uuid::Uuid::new_v4().to_string()))
    }

    /// Start an authenticated request.
    fn authed(
        &self,
        method: Method,
        path: &str,
        token: &SecretString,
    ) -> Result<RequestBuilder, ApiError> {
        if token.expose_secret().is_empty() {
            return Err(ApiError::Unauthenticated);
        }
        Ok(self
            .request(method, path)?
            .bearer_auth(token.expose_secret()))
    }

    /// Send a request and decode its (possibly enveloped) body.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let body = self.send_raw(request).await?;
        match serde_json::from_str::<Envelope<T>>(&body) {
            Ok(envelope) => Ok(envelope.into_inner()),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %body.chars().take(500).collect::<String>(),
                    "Failed to parse API response"
                );
                Err(ApiError::Parse(e))
            }
        }
    }

    /// Send a request whose body is not needed.
    async fn send_unit(&self, request: RequestBuilder) -> Result<(), ApiError> {
        self.send_raw(request).await.map(drop)
    }

    async fn send_raw(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "API returned non-success status"
            );
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: extract_error_message(status, &body),
            });
        }

        Ok(body)
    }

    // =========================================================================
    // Catalog (cached)
    // =========================================================================

    /// Every product in the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn products(&self) -> Result<Vec<Product>, ApiError> {
        self.cached_list(CacheKey::Products, "products").await
    }

    /// Products in one category.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn products_by_category(&self, category: &str) -> Result<Vec<Product>, ApiError> {
        let path = format!("products/category/{}", urlencoding::encode(category));
        self.cached_list(CacheKey::Category(category.to_owned()), &path)
            .await
    }

    /// A single product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown ids, or another error if the
    /// request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: ProductId) -> Result<Product, ApiError> {
        let key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let not_found = || ApiError::NotFound(format!("Product {id}"));
        let request = self.request(Method::GET, &format!("products/id/{id}"))?;
        let body = match self.send_raw(request).await {
            Ok(body) => body,
            Err(ApiError::Api { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                return Err(not_found());
            }
            Err(e) => return Err(e),
        };

        // `{ "data": null }` is how the API reports a missing id with a 200
        let value: serde_json::Value = serde_json::from_str(&body)?;
        if value.is_null() || value.get("data").is_some_and(serde_json::Value::is_null) {
            return Err(not_found());
        }
        let product = serde_json::from_value::<Envelope<Product>>(value)?.into_inner();

        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    async fn cached_list(&self, key: CacheKey, path: &str) -> Result<Vec<Product>, ApiError> {
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product list");
            return Ok(products);
        }

        let request = self.request(Method::GET, path)?;
        let products: Vec<Product> = self.send(request).await?;
        debug!(count = products.len(), "Fetched product list");

        self.inner
            .cache
            .insert(key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Drop every cached catalog read.
    ///
    /// Called after product writes so the next read sees them.
    pub async fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }

    // =========================================================================
    // Selections (not cached - mutable state)
    // =========================================================================

    /// Current members of a logged-in user's cart or wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn selections(
        &self,
        kind: SelectionKind,
        token: &SecretString,
    ) -> Result<Vec<SelectionEntry>, ApiError> {
        let request = self.authed(Method::GET, kind.api_path(), token)?;
        let items: Vec<SelectionItem> = self.send(request).await?;
        Ok(items.into_iter().map(|item| item.into_entry(kind)).collect())
    }

    /// Add a product to a logged-in user's cart or wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn add_selection(
        &self,
        kind: SelectionKind,
        token: &SecretString,
        product_id: ProductId,
        user_id: Option<UserId>,
    ) -> Result<(), ApiError> {
        let request = self
            .authed(Method::POST, kind.api_path(), token)?
            .json(&SelectionWrite {
                product_id,
                user_id,
            });
        self.send_unit(request).await
    }

    /// Remove a product from a logged-in user's cart or wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn remove_selection(
        &self,
        kind: SelectionKind,
        token: &SecretString,
        product_id: ProductId,
        user_id: Option<UserId>,
    ) -> Result<(), ApiError> {
        let request = self
            .authed(Method::DELETE, kind.api_path(), token)?
            .json(&SelectionWrite {
                product_id,
                user_id,
            });
        self.send_unit(request).await
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Exchange credentials for a token and profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected or the request fails.
    #[instrument(skip(self, form))]
    pub async fn login(&self, form: &LoginForm) -> Result<AuthUser, ApiError> {
        let request = self
            .request(Method::POST, "auth/login")?
            .json(&form.to_body());
        let payload: AuthPayload = self.send(request).await?;
        Ok(AuthUser::from(payload.user))
    }

    /// Create an account and log it in.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the account or the request fails.
    #[instrument(skip(self, form))]
    pub async fn signup(&self, form: &SignupForm) -> Result<AuthUser, ApiError> {
        let request = self
            .request(Method::POST, "auth/signup")?
            .json(&form.to_body());
        let payload: AuthPayload = self.send(request).await?;
        Ok(AuthUser::from(payload.user))
    }
}

#[async_trait]
impl RemoteSelections for ApiClient {
    async fn fetch(
        &self,
        kind: SelectionKind,
        token: &SecretString,
    ) -> Result<Vec<SelectionEntry>, ApiError> {
        self.selections(kind, token).await
    }

    async fn add(
        &self,
        kind: SelectionKind,
        token: &SecretString,
        product_id: ProductId,
        user_id: Option<UserId>,
    ) -> Result<(), ApiError> {
        self.add_selection(kind, token, product_id, user_id).await
    }

    async fn remove(
        &self,
        kind: SelectionKind,
        token: &SecretString,
        product_id: ProductId,
        user_id: Option<UserId>,
    ) -> Result<(), ApiError> {
        self.remove_selection(kind, token, product_id, user_id)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(&ApiConfig::new(Url::parse(base).unwrap())).unwrap()
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let api = client("http://shop.test/api");
        assert_eq!(
            api.endpoint("/products/id/3").unwrap().as_str(),
            "http://shop.test/api/products/id/3"
        );

        let root = client("http://shop.test");
        assert_eq!(root.endpoint("basket").unwrap().as_str(), "http://shop.test/basket");
    }

    #[test]
    fn test_asset_url() {
        let api = client("http://localhost:8080");
        assert_eq!(
            api.asset_url("/uploads/lamp.png"),
            "http://localhost:8080/uploads/lamp.png"
        );
        assert_eq!(
            api.asset_url("https://cdn.test/lamp.png"),
            "https://cdn.test/lamp.png"
        );
    }

    #[tokio::test]
    async fn test_empty_token_is_unauthenticated() {
        let api = client("http://localhost:8080");
        let err = api
            .selections(SelectionKind::Cart, &SecretString::from(""))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated));
    }
}
