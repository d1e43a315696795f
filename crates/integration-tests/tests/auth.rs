//! Sign-up, sign-in and access rules.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use handicrafts_core::VendorStatus;
use handicrafts_integration_tests::{PASSWORD, TestApp};

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let app = TestApp::new().await;
    app.signed_in("Meera", "meera@example.com").await;

    let mut other = app.client();
    let response = other
        .post_form(
            "/register",
            &[
                ("name", "Someone Else"),
                ("email", "MEERA@example.com"),
                ("password", "another-password"),
                ("password_confirm", "another-password"),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/register?error=email_taken"));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(app.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_password_confirmation_must_match() {
    let app = TestApp::new().await;
    let response = app
        .client()
        .post_form(
            "/register",
            &[
                ("name", "Ravi"),
                ("email", "ravi@example.com"),
                ("password", PASSWORD),
                ("password_confirm", "something-else"),
            ],
        )
        .await;
    assert_eq!(response.location(), Some("/register?error=password_mismatch"));
}

#[tokio::test]
async fn test_login_logout_cycle() {
    let app = TestApp::new().await;
    app.signed_in("Anil", "anil@example.com").await;

    let mut client = app.client();
    let wrong = client
        .post_form(
            "/login",
            &[("email", "anil@example.com"), ("password", "not-the-password")],
        )
        .await;
    assert_eq!(wrong.location(), Some("/login?error=invalid_credentials"));

    let ok = client
        .post_form(
            "/login",
            &[
                ("email", "anil@example.com"),
                ("password", PASSWORD),
                ("next", "/account/orders"),
            ],
        )
        .await;
    assert_eq!(ok.location(), Some("/account/orders"));

    let account = client.get("/account").await;
    assert_eq!(account.status, StatusCode::OK);
    assert!(account.body.contains("anil@example.com"));

    let out = client.post_form("/logout", &[]).await;
    assert_eq!(out.location(), Some("/"));
    let after = client.get("/account").await;
    assert_eq!(after.location(), Some("/login?next=%2Faccount"));
}

#[tokio::test]
async fn test_open_redirect_is_ignored() {
    let app = TestApp::new().await;
    app.signed_in("Lata", "lata@example.com").await;

    let response = app
        .client()
        .post_form(
            "/login",
            &[
                ("email", "lata@example.com"),
                ("password", PASSWORD),
                ("next", "//evil.example/steal"),
            ],
        )
        .await;
    assert_eq!(response.location(), Some("/"));
}

#[tokio::test]
async fn test_profile_update() {
    let app = TestApp::new().await;
    let mut client = app.signed_in("Kiran", "kiran@example.com").await;

    let response = client
        .post_form(
            "/account",
            &[
                ("name", "Kiran Kumar"),
                ("email", "kiran.kumar@example.com"),
                ("current_password", ""),
                ("new_password", ""),
            ],
        )
        .await;
    assert_eq!(response.location(), Some("/account?success=profile_updated"));

    let user = app.user("kiran.kumar@example.com").await;
    assert_eq!(user.name, "Kiran Kumar");
}

#[tokio::test]
async fn test_protected_pages_redirect_to_login() {
    let app = TestApp::new().await;
    let mut guest = app.client();

    for path in ["/account", "/account/orders", "/wishlist", "/checkout", "/seller", "/admin"] {
        let response = guest.get(path).await;
        assert_eq!(response.status, StatusCode::SEE_OTHER, "{path}");
        let expected = format!("/login?next={}", urlencoding::encode(path));
        assert_eq!(response.location(), Some(expected.as_str()), "{path}");
    }
}

#[tokio::test]
async fn test_sign_in_returns_to_requested_page() {
    let app = TestApp::new().await;
    app.signed_in("Meera", "meera@example.com").await;

    let mut client = app.client();
    let bounced = client.get("/seller/apply").await;
    assert_eq!(bounced.location(), Some("/login?next=%2Fseller%2Fapply"));

    let login_page = client.get("/login?next=%2Fseller%2Fapply").await;
    assert_eq!(login_page.status, StatusCode::OK);

    let ok = client
        .post_form(
            "/login",
            &[
                ("email", "meera@example.com"),
                ("password", PASSWORD),
                ("next", "/seller/apply"),
            ],
        )
        .await;
    assert_eq!(ok.location(), Some("/seller/apply"));
    assert_eq!(client.get("/seller/apply").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_guest_form_posts_redirect_to_plain_login() {
    let app = TestApp::new().await;
    let potter = app
        .vendor("potter@example.com", "Clay Works", VendorStatus::Approved)
        .await;
    let vase = app.product(&potter, "Terracotta Vase", 599, 5).await;

    let response = app
        .client()
        .post_form(&format!("/wishlist/add/{}", vase.id), &[])
        .await;
    assert_eq!(response.location(), Some("/login"));
}
