//! Public pages: listing, search, suggestions and wishlist.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use handicrafts_core::VendorStatus;
use handicrafts_integration_tests::TestApp;
use handicrafts_storefront::db::WishlistRepository;

async fn stocked() -> TestApp {
    let app = TestApp::new().await;
    let potter = app
        .vendor("potter@example.com", "Clay Works", VendorStatus::Approved)
        .await;
    let weaver = app
        .vendor("weaver@example.com", "Loom House", VendorStatus::Approved)
        .await;
    let newcomer = app
        .vendor("new@example.com", "Not Yet Approved", VendorStatus::Pending)
        .await;

    app.product(&potter, "Terracotta Vase", 599, 10).await;
    app.product(&weaver, "Handmade Bamboo Basket", 299, 5).await;
    app.product(&weaver, "Bamboo Lamp Shade", 899, 2).await;
    app.product(&newcomer, "Bamboo Flute", 150, 9).await;
    app
}

#[tokio::test]
async fn test_health_and_static_pages() {
    let app = TestApp::new().await;
    let mut client = app.client();

    let health = client.get("/health").await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(client.get("/health/ready").await.status, StatusCode::OK);
    assert_eq!(client.get("/").await.status, StatusCode::OK);
    assert_eq!(client.get("/about").await.status, StatusCode::OK);

    let response = client.get("/").await;
    assert!(response.headers.contains_key("x-request-id"));
    assert!(response.headers.contains_key("x-content-type-options"));
}

#[tokio::test]
async fn test_search_suggestions_json() {
    let app = stocked().await;
    let mut client = app.client();

    let response = client.get("/search_suggestions?q=bam").await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    let titles: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["title"].as_str().unwrap())
        .collect();

    assert_eq!(titles.len(), 2);
    assert!(titles.contains(&"Handmade Bamboo Basket"));
    assert!(titles.contains(&"Bamboo Lamp Shade"));
    // Products of unapproved vendors are not offered.
    assert!(!titles.contains(&"Bamboo Flute"));
    // Prefix matches come first.
    assert_eq!(titles[0], "Bamboo Lamp Shade");
    assert!(body[0]["url"].as_str().unwrap().starts_with("/products/"));

    let empty = client.get("/search_suggestions?q=").await;
    assert_eq!(empty.json(), serde_json::json!([]));
}

#[tokio::test]
async fn test_listing_filters() {
    let app = stocked().await;
    let mut client = app.client();

    let all = client.get("/products").await;
    assert_eq!(all.status, StatusCode::OK);
    assert!(all.body.contains("Terracotta Vase"));
    assert!(all.body.contains("Handmade Bamboo Basket"));
    assert!(!all.body.contains("Bamboo Flute"));

    let search = client.get("/products?search=vase").await;
    assert!(search.body.contains("Terracotta Vase"));
    assert!(!search.body.contains("Handmade Bamboo Basket"));

    let none = client.get("/products?category=Jewellery").await;
    assert_eq!(none.status, StatusCode::OK);
    assert!(!none.body.contains("Terracotta Vase"));
}

#[tokio::test]
async fn test_product_page_and_missing_product() {
    let app = TestApp::new().await;
    let vendor = app
        .vendor("potter@example.com", "Clay Works", VendorStatus::Approved)
        .await;
    let vase = app.product(&vendor, "Terracotta Vase", 599, 10).await;
    let mut client = app.client();

    let page = client.get(&format!("/products/{}", vase.id)).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("₹599.00"));

    assert_eq!(client.get("/products/424242").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_wishlist_add_and_remove() {
    let app = TestApp::new().await;
    let vendor = app
        .vendor("potter@example.com", "Clay Works", VendorStatus::Approved)
        .await;
    let vase = app.product(&vendor, "Terracotta Vase", 599, 10).await;
    let mut buyer = app.signed_in("Buyer", "buyer@example.com").await;
    let user = app.user("buyer@example.com").await;
    let wishlist = WishlistRepository::new(app.pool());

    let added = buyer
        .post_form(&format!("/wishlist/add/{}", vase.id), &[])
        .await;
    assert_eq!(added.location(), Some("/wishlist"));
    // Adding twice keeps one entry.
    buyer
        .post_form(&format!("/wishlist/add/{}", vase.id), &[])
        .await;
    assert_eq!(wishlist.list(user.id).await.unwrap(), vec![vase.id]);
    assert!(buyer.get("/wishlist").await.body.contains("Terracotta Vase"));

    buyer
        .post_form(&format!("/wishlist/remove/{}", vase.id), &[])
        .await;
    assert!(wishlist.list(user.id).await.unwrap().is_empty());

    let missing = buyer.post_form("/wishlist/add/9999", &[]).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}
