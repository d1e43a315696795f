//! Wishlist route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect},
};
use tracing::instrument;

use handicrafts_core::{DEFAULT_LOCALE, ProductId};

use super::views::{Nav, ProductView};
use crate::db::{ProductRepository, WishlistRepository};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Wishlist page template.
#[derive(Template, WebTemplate)]
#[template(path = "wishlist.html")]
pub struct WishlistTemplate {
    pub nav: Nav,
    pub products: Vec<ProductView>,
}

/// Display the saved products.
///
/// # Errors
///
/// Returns `AppError::Database` if the wishlist cannot be loaded.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, AppError> {
    let ids = WishlistRepository::new(state.pool()).list(user.id).await?;
    let mut products = ProductRepository::new(state.pool()).get_many(&ids).await?;
    // Keep the order the items were saved in.
    products.sort_by_key(|p| ids.iter().position(|id| *id == p.id));

    Ok(WishlistTemplate {
        nav: Nav::new(Some(&user)),
        products: ProductView::list(&products, DEFAULT_LOCALE),
    })
}

/// Save a product. Saving it again is a no-op.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the product doesn't exist.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Redirect, AppError> {
    ProductRepository::new(state.pool())
        .get_by_id(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))?;

    WishlistRepository::new(state.pool())
        .add(user.id, product_id)
        .await?;
    Ok(Redirect::to("/wishlist"))
}

/// Remove a saved product.
///
/// # Errors
///
/// Returns `AppError::Database` if the delete fails.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Redirect, AppError> {
    WishlistRepository::new(state.pool())
        .remove(user.id, product_id)
        .await?;
    Ok(Redirect::to("/wishlist"))
}
