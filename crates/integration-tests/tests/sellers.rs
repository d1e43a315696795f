//! Vendor applications, approval and product management.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use handicrafts_core::{Email, OrderStatus, VendorStatus};
use handicrafts_integration_tests::{Client, TestApp};
use handicrafts_storefront::db::{
    OrderRepository, ProductRepository, UserRepository, VendorRepository,
};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

const BOWL: &[(&str, &str)] = &[
    ("title", "Carved Mango Wood Bowl"),
    ("description", "Hand-carved and oiled."),
    ("category", "Woodwork"),
    ("price", "450"),
    ("stock", "6"),
    ("is_active", "true"),
];

async fn admin(app: &TestApp) -> Client {
    let client = app.signed_in("Admin", "admin@example.com").await;
    UserRepository::new(app.pool())
        .set_admin(&Email::parse("admin@example.com").unwrap(), true)
        .await
        .unwrap();
    client
}

#[tokio::test]
async fn test_application_approval_and_listing() {
    let app = TestApp::new().await;
    let mut seller = app.signed_in("Lakshmi", "lakshmi@example.com").await;

    let dashboard = seller.get("/seller").await;
    assert_eq!(dashboard.status, StatusCode::OK);
    assert!(dashboard.body.contains("/seller/apply"));

    let applied = seller
        .post_form(
            "/seller/apply",
            &[
                ("name", "Lotus Looms"),
                ("description", "Handloom sarees"),
                ("payout_info", "UPI: lotus@upi"),
            ],
        )
        .await;
    assert_eq!(applied.location(), Some("/seller?success=applied"));

    let again = seller
        .post_form("/seller/apply", &[("name", "Lotus Looms Again")])
        .await;
    assert_eq!(again.location(), Some("/seller?error=already_applied"));

    // Pending vendors cannot list products.
    let early = seller.post_multipart("/seller/products/new", BOWL, &[]).await;
    assert_eq!(early.status, StatusCode::FORBIDDEN);
    assert_eq!(seller.get("/seller/products/new").await.status, StatusCode::FORBIDDEN);

    let owner = app.user("lakshmi@example.com").await;
    let vendor = VendorRepository::new(app.pool())
        .get_by_owner(owner.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(vendor.status, VendorStatus::Pending);

    let mut admin = admin(&app).await;
    let approved = admin
        .post_form(&format!("/admin/vendors/{}/approve", vendor.id), &[])
        .await;
    assert_eq!(approved.location(), Some("/admin"));

    let created = seller
        .post_multipart(
            "/seller/products/new",
            BOWL,
            &[("images", "bowl.png", PNG)],
        )
        .await;
    assert_eq!(created.location(), Some("/seller?success=product_saved"));

    let products = ProductRepository::new(app.pool())
        .list_by_vendor(vendor.id)
        .await
        .unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].price.amount_minor, 45_000);
    assert_eq!(products[0].stock, 6);
    assert_eq!(products[0].images.len(), 1);
    assert!(products[0].images[0].starts_with("/uploads/"));

    let listing = app.client().get("/products").await;
    assert!(listing.body.contains("Carved Mango Wood Bowl"));
}

#[tokio::test]
async fn test_invalid_product_form_is_redisplayed() {
    let app = TestApp::new().await;
    app.vendor("potter@example.com", "Clay Works", VendorStatus::Approved)
        .await;
    let mut seller = app.client();
    seller
        .post_form(
            "/login",
            &[
                ("email", "potter@example.com"),
                ("password", handicrafts_integration_tests::PASSWORD),
            ],
        )
        .await;

    let response = seller
        .post_multipart(
            "/seller/products/new",
            &[("title", "Vase"), ("category", "Pottery"), ("price", "abc"), ("stock", "1")],
            &[],
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body.contains("Vase"));

    let bad_image = seller
        .post_multipart("/seller/products/new", BOWL, &[("images", "virus.exe", PNG)])
        .await;
    assert_eq!(bad_image.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sellers_cannot_edit_each_others_products() {
    let app = TestApp::new().await;
    let potter = app
        .vendor("potter@example.com", "Clay Works", VendorStatus::Approved)
        .await;
    app.vendor("weaver@example.com", "Loom House", VendorStatus::Approved)
        .await;
    let vase = app.product(&potter, "Terracotta Vase", 599, 3).await;

    let mut weaver = app.client();
    weaver
        .post_form(
            "/login",
            &[
                ("email", "weaver@example.com"),
                ("password", handicrafts_integration_tests::PASSWORD),
            ],
        )
        .await;

    let path = format!("/seller/products/{}/edit", vase.id);
    assert!(weaver.get(&path).await.status.is_client_error());
    let response = weaver.post_multipart(&path, BOWL, &[]).await;
    assert!(response.status.is_client_error());

    let unchanged = app.reload_product(&vase).await;
    assert_eq!(unchanged.title.default_text(), "Terracotta Vase");
}

#[tokio::test]
async fn test_admin_routes_require_admin_flag() {
    let app = TestApp::new().await;
    let mut user = app.signed_in("Plain User", "plain@example.com").await;

    assert_eq!(user.get("/admin").await.status, StatusCode::FORBIDDEN);
    assert_eq!(
        user.post_form("/admin/vendors/1/approve", &[]).await.status,
        StatusCode::FORBIDDEN
    );

    let mut admin = admin(&app).await;
    let page = admin.get("/admin").await;
    assert_eq!(page.status, StatusCode::OK);

    // Revoking the flag takes effect on the next request.
    UserRepository::new(app.pool())
        .set_admin(&Email::parse("admin@example.com").unwrap(), false)
        .await
        .unwrap();
    assert_eq!(admin.get("/admin").await.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_cancels_pending_order() {
    let app = TestApp::new().await;
    let potter = app
        .vendor("potter@example.com", "Clay Works", VendorStatus::Approved)
        .await;
    let vase = app.product(&potter, "Terracotta Vase", 599, 3).await;
    let mut buyer = app.signed_in("Buyer", "buyer@example.com").await;
    buyer
        .post_form("/cart/add", &[("product_id", &vase.id.to_string())])
        .await;
    buyer
        .post_form(
            "/checkout",
            &[
                ("full_name", "Asha Rao"),
                ("line1", "12 Temple Road"),
                ("city", "Mysuru"),
                ("state", "Karnataka"),
                ("postal_code", "570001"),
                ("country", "India"),
            ],
        )
        .await;
    let user = app.user("buyer@example.com").await;
    let orders = OrderRepository::new(app.pool());
    let order = orders.list_by_user(user.id).await.unwrap().remove(0);

    let mut admin = admin(&app).await;
    // Only paid orders can ship.
    let ship = admin
        .post_form(&format!("/admin/orders/{}/ship", order.id), &[])
        .await;
    assert_eq!(ship.status, StatusCode::CONFLICT);

    let cancel = admin
        .post_form(&format!("/admin/orders/{}/cancel", order.id), &[])
        .await;
    assert_eq!(cancel.location(), Some("/admin"));
    let order = orders.get_by_id(order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
}
