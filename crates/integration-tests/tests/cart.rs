//! Cart behavior for guests and signed-in buyers.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use handicrafts_core::VendorStatus;
use handicrafts_integration_tests::{PASSWORD, TestApp};
use handicrafts_storefront::db::CartRepository;

#[tokio::test]
async fn test_adding_twice_increments_quantity() {
    let app = TestApp::new().await;
    let vendor = app.vendor("potter@example.com", "Clay Works", VendorStatus::Approved).await;
    let vase = app.product(&vendor, "Terracotta Vase", 599, 10).await;
    let mut buyer = app.signed_in("Buyer", "buyer@example.com").await;

    let path = format!("/add_to_cart/{}", vase.id);
    assert_eq!(buyer.get(&path).await.location(), Some("/products"));
    assert_eq!(buyer.get(&path).await.location(), Some("/products"));

    let user = app.user("buyer@example.com").await;
    let lines = CartRepository::new(app.pool()).list(user.id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].product_id, vase.id);
    assert_eq!(lines[0].quantity, 2);

    let page = buyer.get("/cart").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Terracotta Vase"));
    assert!(page.body.contains("₹1198.00"));
}

#[tokio::test]
async fn test_guest_cart_moves_into_account_on_login() {
    let app = TestApp::new().await;
    let vendor = app.vendor("weaver@example.com", "Loom House", VendorStatus::Approved).await;
    let basket = app.product(&vendor, "Handmade Bamboo Basket", 299, 5).await;
    app.signed_in("Returning", "returning@example.com").await;

    let mut guest = app.client();
    let added = guest
        .post_form(
            "/cart/add",
            &[("product_id", &basket.id.to_string()), ("quantity", "3")],
        )
        .await;
    assert_eq!(added.location(), Some("/cart"));
    assert!(guest.get("/cart").await.body.contains("Handmade Bamboo Basket"));

    let login = guest
        .post_form(
            "/login",
            &[("email", "returning@example.com"), ("password", PASSWORD)],
        )
        .await;
    assert_eq!(login.location(), Some("/"));

    let user = app.user("returning@example.com").await;
    let lines = CartRepository::new(app.pool()).list(user.id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 3);
}

#[tokio::test]
async fn test_update_and_remove_lines() {
    let app = TestApp::new().await;
    let vendor = app.vendor("carver@example.com", "Wood Wise", VendorStatus::Approved).await;
    let bowl = app.product(&vendor, "Carved Bowl", 450, 8).await;
    let mut buyer = app.signed_in("Buyer", "buyer@example.com").await;
    let user = app.user("buyer@example.com").await;
    let id = bowl.id.to_string();
    let carts = CartRepository::new(app.pool());

    buyer.post_form("/cart/add", &[("product_id", &id)]).await;
    buyer
        .post_form("/cart/update", &[("product_id", &id), ("quantity", "4")])
        .await;
    assert_eq!(carts.list(user.id).await.unwrap()[0].quantity, 4);

    buyer
        .post_form("/cart/update", &[("product_id", &id), ("quantity", "0")])
        .await;
    assert!(carts.list(user.id).await.unwrap().is_empty());

    buyer.post_form("/cart/add", &[("product_id", &id)]).await;
    let removed = buyer.post_form("/cart/remove", &[("product_id", &id)]).await;
    assert_eq!(removed.location(), Some("/cart"));
    assert!(carts.list(user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_or_sold_out_products_are_refused() {
    let app = TestApp::new().await;
    let vendor = app.vendor("smith@example.com", "Brass Bazaar", VendorStatus::Approved).await;
    let lamp = app.product(&vendor, "Brass Lamp", 899, 0).await;
    let mut guest = app.client();

    let missing = guest.get("/add_to_cart/9999").await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let sold_out = guest.get(&format!("/add_to_cart/{}", lamp.id)).await;
    assert_eq!(sold_out.status, StatusCode::CONFLICT);

    let mut buyer = app.signed_in("Buyer", "buyer@example.com").await;
    let user = app.user("buyer@example.com").await;
    let lamp_id = lamp.id.to_string();

    let unknown = buyer
        .post_form("/cart/update", &[("product_id", "987654"), ("quantity", "1")])
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let sneaked = buyer
        .post_form("/cart/update", &[("product_id", &lamp_id), ("quantity", "5")])
        .await;
    assert_eq!(sneaked.status, StatusCode::CONFLICT);
    assert!(CartRepository::new(app.pool()).list(user.id).await.unwrap().is_empty());

    let guest_update = guest
        .post_form("/cart/update", &[("product_id", &lamp_id), ("quantity", "2")])
        .await;
    assert_eq!(guest_update.status, StatusCode::CONFLICT);
    assert!(!guest.get("/cart").await.body.contains("Brass Lamp"));
}
