//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Home page
//! GET  /about                     - About page
//!
//! # Catalog
//! GET  /products                  - Listing (?search=&category=&lang=)
//! GET  /products/{id}             - Product detail
//! GET  /search_suggestions        - Title suggestions (JSON)
//!
//! # Cart
//! GET  /cart                      - Cart page
//! GET  /add_to_cart/{id}          - Add one unit, back to listing
//! POST /cart/add                  - Add with quantity
//! POST /cart/update               - Set quantity (0 removes)
//! POST /cart/remove               - Remove line
//!
//! # Checkout (requires auth)
//! GET  /checkout                  - Shipping address form
//! POST /checkout                  - Create orders, redirect to payment page
//! GET  /checkout/success          - Thank-you page
//! GET  /checkout/cancel           - Payment abandoned
//! POST /webhook                   - Payment provider events
//!
//! # Auth
//! GET|POST /login, /register      - Sign in / sign up (rate limited)
//! POST /logout                    - Sign out
//!
//! # Account (requires auth)
//! GET|POST /account               - Profile
//! GET  /account/orders            - Order history
//! GET  /wishlist                  - Saved products
//! POST /wishlist/add/{id}         - Save product
//! POST /wishlist/remove/{id}      - Unsave product
//!
//! # Seller (requires auth; product routes require an approved vendor)
//! GET  /seller                    - Dashboard
//! GET|POST /seller/apply          - Vendor application
//! GET|POST /seller/products/new   - Create product (multipart)
//! GET|POST /seller/products/{id}/edit - Edit product (multipart)
//!
//! # Admin (requires admin flag)
//! GET  /admin                     - Vendors, orders, payouts
//! POST /admin/vendors/{id}/approve|reject
//! POST /admin/orders/{id}/ship|cancel
//! POST /admin/payouts/{id}/paid
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod pages;
pub mod products;
pub mod seller;
pub mod views;
pub mod webhook;
pub mod wishlist;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::middleware::{auth_rate_limiter, webhook_rate_limiter};
use crate::services::uploads::MAX_IMAGE_BYTES;
use crate::state::AppState;

/// Largest product form accepted: a handful of images plus the text fields.
const MAX_PRODUCT_FORM_BYTES: usize = 4 * MAX_IMAGE_BYTES + 64 * 1024;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .layer(auth_rate_limiter())
        .route("/logout", post(auth::logout))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show).post(checkout::submit))
        .route("/success", get(checkout::success))
        .route("/cancel", get(checkout::cancel))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::profile).post(account::update_profile))
        .route("/orders", get(account::orders))
}

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlist::index))
        .route("/add/{id}", post(wishlist::add))
        .route("/remove/{id}", post(wishlist::remove))
}

/// Create the seller routes router.
pub fn seller_routes() -> Router<AppState> {
    let products = Router::new()
        .route(
            "/new",
            get(seller::new_product_page).post(seller::create_product),
        )
        .route(
            "/{id}/edit",
            get(seller::edit_product_page).post(seller::update_product),
        )
        .layer(DefaultBodyLimit::max(MAX_PRODUCT_FORM_BYTES));

    Router::new()
        .route("/", get(seller::dashboard))
        .route("/apply", get(seller::apply_page).post(seller::apply))
        .nest("/products", products)
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::dashboard))
        .route("/vendors/{id}/approve", post(admin::approve_vendor))
        .route("/vendors/{id}/reject", post(admin::reject_vendor))
        .route("/orders/{id}/ship", post(admin::ship_order))
        .route("/orders/{id}/cancel", post(admin::cancel_order))
        .route("/payouts/{id}/paid", post(admin::mark_payout_paid))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/about", get(pages::about))
        .nest("/products", product_routes())
        .route("/search_suggestions", get(products::search_suggestions))
        .route("/add_to_cart/{id}", get(cart::add_one))
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .route(
            "/webhook",
            post(webhook::stripe).layer(webhook_rate_limiter()),
        )
        .merge(auth_routes())
        .nest("/account", account_routes())
        .nest("/wishlist", wishlist_routes())
        .nest("/seller", seller_routes())
        .nest("/admin", admin_routes())
}
