//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use handicrafts_core::DEFAULT_LOCALE;

use super::views::{Nav, ProductView};
use crate::error::AppError;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::state::AppState;

/// Number of products shown on the home page.
const FEATURED_COUNT: usize = 8;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub nav: Nav,
    pub featured: Vec<ProductView>,
    pub categories: Vec<String>,
}

/// Display the home page with the newest products.
///
/// # Errors
///
/// Returns `AppError::Database` if the catalog cannot be loaded.
#[instrument(skip(state, user))]
pub async fn home(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Result<impl IntoResponse, AppError> {
    let products = state.catalog().active_products(state.pool()).await?;
    let featured: Vec<ProductView> = products
        .iter()
        .take(FEATURED_COUNT)
        .map(|p| ProductView::new(p, DEFAULT_LOCALE))
        .collect();
    let categories = state.catalog().categories(state.pool()).await?;

    Ok(HomeTemplate {
        nav: Nav::new(user.as_ref()),
        featured,
        categories,
    })
}
