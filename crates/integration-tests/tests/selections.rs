//! Cart and wishlist reconciliation between local storage and the API.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use marigold_core::{Membership, ProductId, SelectionKind};
use marigold_integration_tests::{FakeApi, SHOPPER};
use marigold_storefront::forms::LoginForm;
use marigold_storefront::selection::{CartSummary, SelectionBadge, SelectionError};
use marigold_storefront::state::AppState;
use marigold_storefront::storage::keys;

const SHOPPER_ID: i32 = 2;

async fn logged_in(api: &FakeApi) -> AppState {
    let state = api.app_state();
    state
        .session()
        .login(state.api(), &LoginForm::new(SHOPPER.0, SHOPPER.1))
        .await
        .unwrap();
    state
}

fn ids(entries: &[marigold_storefront::api::SelectionEntry]) -> Vec<i32> {
    entries.iter().map(|e| e.product_id.as_i32()).collect()
}

// =============================================================================
// Anonymous path
// =============================================================================

#[tokio::test]
async fn test_anonymous_wishlist_toggles_in_local_storage() {
    let api = FakeApi::spawn().await;
    let state = api.app_state();
    let mut selections = state.selections();
    let id = ProductId::new(42);

    selections.add(SelectionKind::Wishlist, id).await.unwrap();
    assert_eq!(state.store().get(keys::WISHLIST).as_deref(), Some("[42]"));

    let membership = selections.toggle(SelectionKind::Wishlist, id).await.unwrap();
    assert_eq!(membership, Membership::Absent);
    assert_eq!(state.store().get(keys::WISHLIST).as_deref(), Some("[]"));

    assert!(api.requests().is_empty());
}

#[tokio::test]
async fn test_anonymous_double_toggle_restores_membership() {
    let api = FakeApi::spawn().await;
    let state = api.app_state();
    state.store().set(keys::CART, "[1,7]").unwrap();
    let mut selections = state.selections();

    for id in [1, 3, 7] {
        let id = ProductId::new(id);
        let before = ids(&selections.list(SelectionKind::Cart).await.unwrap());
        selections.toggle(SelectionKind::Cart, id).await.unwrap();
        selections.toggle(SelectionKind::Cart, id).await.unwrap();
        let mut after = ids(&selections.list(SelectionKind::Cart).await.unwrap());
        let mut expected = before;
        after.sort_unstable();
        expected.sort_unstable();
        assert_eq!(after, expected, "double toggle of {id}");
    }
}

#[tokio::test]
async fn test_cleared_and_malformed_storage_list_as_empty() {
    let api = FakeApi::spawn().await;
    let state = api.app_state();
    let mut selections = state.selections();

    state.store().clear().unwrap();
    assert!(selections.list(SelectionKind::Cart).await.unwrap().is_empty());

    state.store().set(keys::CART, "{not json").unwrap();
    state.store().set(keys::WISHLIST, "\"42\"").unwrap();
    assert!(selections.list(SelectionKind::Cart).await.unwrap().is_empty());
    assert!(selections.list(SelectionKind::Wishlist).await.unwrap().is_empty());
}

// =============================================================================
// Authenticated path
// =============================================================================

#[tokio::test]
async fn test_authenticated_changes_go_to_the_api() {
    let api = FakeApi::spawn().await;
    let state = logged_in(&api).await;
    let mut selections = state.selections();

    selections.list(SelectionKind::Cart).await.unwrap();
    selections.add(SelectionKind::Cart, ProductId::new(7)).await.unwrap();
    selections.add(SelectionKind::Cart, ProductId::new(2)).await.unwrap();
    assert_eq!(api.basket(SHOPPER_ID), vec![7, 2]);
    assert!(selections.contains(SelectionKind::Cart, ProductId::new(7)));

    selections.remove(SelectionKind::Cart, ProductId::new(7)).await.unwrap();
    assert_eq!(api.basket(SHOPPER_ID), vec![2]);
    assert_eq!(state.store().get(keys::CART), None);

    let entries = selections.list(SelectionKind::Cart).await.unwrap();
    assert_eq!(ids(&entries), vec![2]);
    let snapshot = entries[0].snapshot.as_ref().unwrap();
    assert_eq!(snapshot.title, "Eyeshadow Palette with Mirror");
}

#[tokio::test]
async fn test_adding_a_present_product_sends_nothing() {
    let api = FakeApi::spawn().await;
    api.seed_basket(SHOPPER_ID, 7);
    let state = logged_in(&api).await;
    let mut selections = state.selections();

    selections.list(SelectionKind::Cart).await.unwrap();
    selections.add(SelectionKind::Cart, ProductId::new(7)).await.unwrap();

    assert_eq!(api.count("POST", "/basket"), 0);
    assert_eq!(api.basket(SHOPPER_ID), vec![7]);
}

#[tokio::test]
async fn test_toggle_before_listing_removes_a_server_member() {
    let api = FakeApi::spawn().await;
    api.seed_basket(SHOPPER_ID, 7);
    let state = logged_in(&api).await;
    let mut selections = state.selections();

    let membership = selections.toggle(SelectionKind::Cart, ProductId::new(7)).await.unwrap();

    assert_eq!(membership, Membership::Absent);
    assert!(api.basket(SHOPPER_ID).is_empty());
    assert_eq!(api.count("GET", "/basket"), 1);
    assert_eq!(api.count("POST", "/basket"), 0);
}

#[tokio::test]
async fn test_toggle_before_listing_fails_when_the_set_cannot_load() {
    let api = FakeApi::spawn().await;
    api.seed_basket(SHOPPER_ID, 7);
    let state = logged_in(&api).await;
    let mut selections = state.selections();

    api.fail_selection_reads(true);
    let err = selections
        .toggle(SelectionKind::Cart, ProductId::new(7))
        .await
        .unwrap_err();

    assert!(matches!(err, SelectionError::FetchFailed { .. }), "got {err:?}");
    assert_eq!(api.basket(SHOPPER_ID), vec![7]);
    assert_eq!(api.count("POST", "/basket"), 0);
    assert_eq!(api.count("DELETE", "/basket"), 0);
}

#[tokio::test]
async fn test_authenticated_double_toggle_restores_membership() {
    let api = FakeApi::spawn().await;
    api.seed_basket(SHOPPER_ID, 1);
    let state = logged_in(&api).await;
    let mut selections = state.selections();
    selections.list(SelectionKind::Wishlist).await.unwrap();

    let first = selections.toggle(SelectionKind::Wishlist, ProductId::new(3)).await.unwrap();
    assert_eq!(first, Membership::Present);
    assert_eq!(api.wishlist(SHOPPER_ID), vec![3]);

    let second = selections.toggle(SelectionKind::Wishlist, ProductId::new(3)).await.unwrap();
    assert_eq!(second, Membership::Absent);
    assert!(api.wishlist(SHOPPER_ID).is_empty());
    assert_eq!(api.basket(SHOPPER_ID), vec![1]);
}

#[tokio::test]
async fn test_failed_add_leaves_no_trace() {
    let api = FakeApi::spawn().await;
    let state = logged_in(&api).await;
    let mut selections = state.selections();
    selections.list(SelectionKind::Cart).await.unwrap();
    let mut events = selections.subscribe();
    let keys_before = state.store().keys();

    api.fail_selection_writes(true);
    let err = selections
        .toggle(SelectionKind::Cart, ProductId::new(7))
        .await
        .unwrap_err();

    assert!(matches!(err, SelectionError::UpdateFailed { .. }), "got {err:?}");
    assert_eq!(err.user_message(), "Could not update basket");
    assert!(!selections.contains(SelectionKind::Cart, ProductId::new(7)));
    assert!(selections.entries(SelectionKind::Cart).is_empty());
    assert_eq!(state.store().keys(), keys_before);
    assert_eq!(state.store().get(keys::CART), None);
    assert!(events.try_recv().is_err());
    assert!(api.basket(SHOPPER_ID).is_empty());

    api.fail_selection_writes(false);
    assert!(selections.list(SelectionKind::Cart).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_fetch_keeps_what_was_loaded() {
    let api = FakeApi::spawn().await;
    api.seed_basket(SHOPPER_ID, 42);
    let state = logged_in(&api).await;
    let mut selections = state.selections();
    selections.list(SelectionKind::Cart).await.unwrap();

    api.fail_selection_reads(true);
    let err = selections.list(SelectionKind::Cart).await.unwrap_err();

    assert_eq!(err.user_message(), "Error fetching Cart. Please try again.");
    assert!(selections.contains(SelectionKind::Cart, ProductId::new(42)));
}

// =============================================================================
// Identity changes
// =============================================================================

#[tokio::test]
async fn test_login_does_not_transfer_anonymous_selections() {
    let api = FakeApi::spawn().await;
    let state = api.app_state();
    let mut selections = state.selections();
    selections.add(SelectionKind::Cart, ProductId::new(1)).await.unwrap();
    selections.add(SelectionKind::Wishlist, ProductId::new(42)).await.unwrap();

    state
        .session()
        .login(state.api(), &LoginForm::new(SHOPPER.0, SHOPPER.1))
        .await
        .unwrap();

    assert!(!selections.contains(SelectionKind::Cart, ProductId::new(1)));
    assert!(selections.list(SelectionKind::Cart).await.unwrap().is_empty());
    assert!(selections.list(SelectionKind::Wishlist).await.unwrap().is_empty());
    assert!(api.basket(SHOPPER_ID).is_empty());
    assert_eq!(api.count("POST", "/basket"), 0);
    assert_eq!(api.count("POST", "/wishlist"), 0);
    assert_eq!(state.store().get(keys::CART).as_deref(), Some("[1]"));
}

#[tokio::test]
async fn test_logout_drops_to_an_empty_anonymous_set() {
    let api = FakeApi::spawn().await;
    api.seed_basket(SHOPPER_ID, 7);
    let state = logged_in(&api).await;
    let mut selections = state.selections();
    assert_eq!(ids(&selections.list(SelectionKind::Cart).await.unwrap()), vec![7]);

    state.session().logout().unwrap();

    assert!(!selections.contains(SelectionKind::Cart, ProductId::new(7)));
    assert!(selections.list(SelectionKind::Cart).await.unwrap().is_empty());
    assert_eq!(api.basket(SHOPPER_ID), vec![7]);
}

// =============================================================================
// Surfaces
// =============================================================================

#[tokio::test]
async fn test_badge_follows_changes_made_elsewhere() {
    let api = FakeApi::spawn().await;
    let state = logged_in(&api).await;
    let mut badge = SelectionBadge::new(SelectionKind::Cart, state.selections());
    assert_eq!(badge.refresh().await, 0);

    let mut page = state.selections();
    page.list(SelectionKind::Cart).await.unwrap();
    page.add(SelectionKind::Cart, ProductId::new(7)).await.unwrap();

    let count = tokio::time::timeout(Duration::from_secs(5), badge.next_update())
        .await
        .unwrap();
    assert_eq!(count, Some(1));
}

#[tokio::test]
async fn test_cart_summary_uses_loaded_snapshots() {
    let api = FakeApi::spawn().await;
    api.seed_basket(SHOPPER_ID, 1);
    api.seed_basket(SHOPPER_ID, 2);
    let state = logged_in(&api).await;
    let mut selections = state.selections();

    let entries = selections.list(SelectionKind::Cart).await.unwrap();
    let summary = CartSummary::from_entries(&entries);

    assert_eq!(summary.item_count, 2);
    assert_eq!(summary.subtotal.to_string(), "29.98");
    assert_eq!(summary.total, summary.subtotal - summary.discount);
}
