//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use handicrafts_core::{DEFAULT_LOCALE, ProductId};

use super::views::{Nav, ProductView, error_message};
use crate::error::AppError;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::services::catalog::{ALL_CATEGORIES, ProductQuery, Suggestion};
use crate::state::AppState;

/// Listing filters.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub lang: Option<String>,
    pub error: Option<String>,
}

/// Locale selection for detail pages.
#[derive(Debug, Default, Deserialize)]
pub struct LocaleQuery {
    pub lang: Option<String>,
}

/// `/search_suggestions` parameters.
#[derive(Debug, Default, Deserialize)]
pub struct SuggestionQuery {
    #[serde(default)]
    pub q: String,
    pub lang: Option<String>,
}

fn locale(lang: Option<&str>) -> &str {
    lang.map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(DEFAULT_LOCALE)
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub nav: Nav,
    pub products: Vec<ProductView>,
    pub categories: Vec<String>,
    pub search: String,
    pub category: String,
    pub error: Option<String>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub nav: Nav,
    pub product: ProductView,
}

/// Display the product listing with optional search and category filter.
///
/// # Errors
///
/// Returns `AppError::Database` if the catalog cannot be loaded.
#[instrument(skip(state, user))]
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<ListingQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = ProductQuery {
        search: query.search.clone(),
        category: query.category.clone(),
    };
    let products = state.catalog().search(state.pool(), &filter).await?;
    let categories = state.catalog().categories(state.pool()).await?;

    Ok(ProductsIndexTemplate {
        nav: Nav::new(user.as_ref()),
        products: ProductView::list(&products, locale(query.lang.as_deref())),
        categories,
        search: query.search.unwrap_or_default(),
        category: query
            .category
            .unwrap_or_else(|| ALL_CATEGORIES.to_string()),
        error: query.error.as_deref().map(error_message),
    })
}

/// Display a single product.
///
/// Inactive products and products of vendors who may not sell are hidden.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the product is not publicly listed.
#[instrument(skip(state, user))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<ProductId>,
    Query(query): Query<LocaleQuery>,
) -> Result<impl IntoResponse, AppError> {
    let products = state.catalog().active_products(state.pool()).await?;
    let product = products
        .iter()
        .find(|p| p.id == id)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    Ok(ProductShowTemplate {
        nav: Nav::new(user.as_ref()),
        product: ProductView::new(product, locale(query.lang.as_deref())),
    })
}

/// Title suggestions for the search box.
///
/// # Errors
///
/// Returns `AppError::Database` if the catalog cannot be loaded.
#[instrument(skip(state))]
pub async fn search_suggestions(
    State(state): State<AppState>,
    Query(query): Query<SuggestionQuery>,
) -> Result<Json<Vec<Suggestion>>, AppError> {
    let suggestions = state
        .catalog()
        .suggestions(state.pool(), &query.q, locale(query.lang.as_deref()))
        .await?;
    Ok(Json(suggestions))
}
