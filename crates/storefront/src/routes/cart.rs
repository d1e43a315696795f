//! Cart route handlers.
//!
//! Every mutation redirects back to a page, so the cart works without
//! JavaScript. Guests and signed-in users share the handlers; `CartOwner`
//! decides where the lines are stored.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use handicrafts_core::ProductId;

use super::views::{CartView, Nav};
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::services::{CartOwner, CartService};
use crate::state::AppState;

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: ProductId,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub nav: Nav,
    pub cart: CartView,
}

/// Display the cart page.
///
/// # Errors
///
/// Returns `AppError::Cart` if the cart cannot be loaded.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<impl IntoResponse, AppError> {
    let owner = CartOwner::new(user.as_ref(), &session);
    let summary = CartService::new(state.pool()).summary(owner).await?;

    Ok(CartShowTemplate {
        nav: Nav::new(user.as_ref()),
        cart: CartView::from(&summary),
    })
}

/// Add one unit from a product link and return to the listing.
///
/// # Errors
///
/// Returns `AppError::Cart` if the product cannot be added.
#[instrument(skip(state, session, user))]
pub async fn add_one(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Redirect, AppError> {
    let owner = CartOwner::new(user.as_ref(), &session);
    CartService::new(state.pool())
        .add(owner, product_id, 1)
        .await?;
    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("product_id", product_id.to_string().as_str())]),
    );
    Ok(Redirect::to("/products"))
}

/// Add a product with a quantity.
///
/// # Errors
///
/// Returns `AppError::Cart` if the product cannot be added.
#[instrument(skip(state, session, user))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<AddToCartForm>,
) -> Result<Redirect, AppError> {
    let owner = CartOwner::new(user.as_ref(), &session);
    let quantity = CartService::new(state.pool())
        .add(owner, form.product_id, form.quantity.unwrap_or(1))
        .await?;
    tracing::debug!(product_id = %form.product_id, quantity, "Cart line updated");
    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("product_id", form.product_id.to_string().as_str())]),
    );
    Ok(Redirect::to("/cart"))
}

/// Set a line's quantity. Zero removes the line.
///
/// # Errors
///
/// Returns `AppError::Cart` if the cart cannot be written.
#[instrument(skip(state, session, user))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<UpdateCartForm>,
) -> Result<Redirect, AppError> {
    let owner = CartOwner::new(user.as_ref(), &session);
    CartService::new(state.pool())
        .set(owner, form.product_id, form.quantity)
        .await?;
    Ok(Redirect::to("/cart"))
}

/// Remove a line.
///
/// # Errors
///
/// Returns `AppError::Cart` if the cart cannot be written.
#[instrument(skip(state, session, user))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Redirect, AppError> {
    let owner = CartOwner::new(user.as_ref(), &session);
    CartService::new(state.pool())
        .remove(owner, form.product_id)
        .await?;
    Ok(Redirect::to("/cart"))
}
