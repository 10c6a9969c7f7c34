//! Catalog reads against the fake API.

#![allow(clippy::unwrap_used)]

use marigold_core::{Price, ProductId};
use marigold_integration_tests::FakeApi;
use marigold_storefront::api::ApiError;
use marigold_storefront::catalog::{StockLevel, related, search};

#[tokio::test]
async fn test_lists_products_with_numeric_and_string_prices() {
    let api = FakeApi::spawn().await;
    let state = api.app_state();

    let products = state.api().products().await.unwrap();
    assert_eq!(products.len(), 5);

    let palette = products.iter().find(|p| p.id == ProductId::new(2)).unwrap();
    assert_eq!(palette.price, Price::from_cents(1999));
    assert_eq!(products[0].price, Price::from_cents(999));
}

#[tokio::test]
async fn test_catalog_reads_are_cached() {
    let api = FakeApi::spawn().await;
    let state = api.app_state();

    state.api().products().await.unwrap();
    state.api().products().await.unwrap();
    assert_eq!(api.count("GET", "/products"), 1);

    state.api().product(ProductId::new(7)).await.unwrap();
    state.api().product(ProductId::new(7)).await.unwrap();
    assert_eq!(api.count("GET", "/products/id/7"), 1);
}

#[tokio::test]
async fn test_filters_by_category() {
    let api = FakeApi::spawn().await;
    let state = api.app_state();

    let groceries = state.api().products_by_category("groceries").await.unwrap();
    let ids: Vec<i32> = groceries.iter().map(|p| p.id.as_i32()).collect();
    assert_eq!(ids, vec![7, 42]);

    let empty = state.api().products_by_category("garden tools").await.unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn test_missing_product_is_not_found() {
    let api = FakeApi::spawn().await;
    let state = api.app_state();

    let err = state.api().product(ProductId::new(999)).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)), "got {err:?}");
    assert_eq!(err.user_message(), "Product 999 not found");
}

#[tokio::test]
async fn test_every_request_carries_a_request_id() {
    let api = FakeApi::spawn().await;
    let state = api.app_state();

    state.api().products().await.unwrap();
    state.api().product(ProductId::new(1)).await.unwrap();

    let requests = api.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r.request_id.is_some()));
    assert_ne!(requests[0].request_id, requests[1].request_id);
}

#[tokio::test]
async fn test_detail_helpers_work_on_fetched_products() {
    let api = FakeApi::spawn().await;
    let state = api.app_state();
    let products = state.api().products().await.unwrap();

    let found = search(&products, "MASCARA");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, ProductId::new(1));

    let apple = products.iter().find(|p| p.id == ProductId::new(7)).unwrap();
    let related_ids: Vec<ProductId> = related(&products, apple).iter().map(|p| p.id).collect();
    assert_eq!(related_ids, vec![ProductId::new(42)]);

    let bed = products.iter().find(|p| p.id == ProductId::new(3)).unwrap();
    assert!(matches!(StockLevel::of(bed), StockLevel::OutOfStock { .. }));
    let mascara = products.iter().find(|p| p.id == ProductId::new(1)).unwrap();
    assert_eq!(StockLevel::of(mascara), StockLevel::Low(5));
}

#[tokio::test]
async fn test_asset_paths_resolve_against_the_api() {
    let api = FakeApi::spawn().await;
    let state = api.app_state();
    let product = state.api().product(ProductId::new(1)).await.unwrap();

    let thumbnail = product.thumbnail.as_deref().unwrap();
    let url = state.api().asset_url(thumbnail);
    assert_eq!(url, format!("{}uploads/mascara.png", api.base_url()));
}
