//! Seller area route handlers.
//!
//! Any signed-in user may apply to sell. Creating and editing products
//! requires an approved vendor; everyone else gets 403.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use handicrafts_core::{DEFAULT_LOCALE, ProductId};

use super::views::{Nav, OrderView, PayoutView, ProductView, VendorView, error_message, success_message};
use crate::db::{OrderRepository, PayoutRepository, ProductRepository};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, Product};
use crate::services::vendors::{ProductInput, VendorApplication};
use crate::services::{VendorError, VendorService};
use crate::state::AppState;

/// Query parameters for error/success display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Seller dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "seller/dashboard.html")]
pub struct DashboardTemplate {
    pub nav: Nav,
    pub vendor: Option<VendorView>,
    pub products: Vec<ProductView>,
    pub orders: Vec<OrderView>,
    pub payouts: Vec<PayoutView>,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Seller application template.
#[derive(Template, WebTemplate)]
#[template(path = "seller/apply.html")]
pub struct ApplyTemplate {
    pub nav: Nav,
    pub form: VendorApplication,
    pub error: Option<String>,
}

/// Product create/edit template.
#[derive(Template, WebTemplate)]
#[template(path = "seller/product_form.html")]
pub struct ProductFormTemplate {
    pub nav: Nav,
    pub heading: &'static str,
    pub action: String,
    pub form: ProductInput,
    pub currency: String,
    pub images: Vec<String>,
    pub error: Option<String>,
}

impl ProductFormTemplate {
    fn new_product(user: &CurrentUser, currency: String, form: ProductInput) -> Self {
        Self {
            nav: Nav::new(Some(user)),
            heading: "New product",
            action: "/seller/products/new".to_string(),
            form,
            currency,
            images: Vec::new(),
            error: None,
        }
    }

    fn edit_product(user: &CurrentUser, product: &Product, form: ProductInput) -> Self {
        Self {
            nav: Nav::new(Some(user)),
            heading: "Edit product",
            action: format!("/seller/products/{}/edit", product.id),
            form,
            currency: product.price.currency.to_string(),
            images: product.images.clone(),
            error: None,
        }
    }

    fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }
}

/// An uploaded file from the product form.
struct UploadedImage {
    file_name: String,
    data: axum::body::Bytes,
}

/// Split the multipart product form into fields and image files.
async fn read_product_form(
    mut multipart: Multipart,
) -> Result<(ProductInput, Vec<UploadedImage>), AppError> {
    let mut input = ProductInput::default();
    let mut images = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "images" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            // Browsers send an empty part when no file was chosen.
            if !file_name.is_empty() && !data.is_empty() {
                images.push(UploadedImage { file_name, data });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        match name.as_str() {
            "title" => input.title = value,
            "description" => input.description = value,
            "category" => input.category = value,
            "price" => input.price = value,
            "stock" => input.stock = value,
            "is_active" => input.is_active = !value.is_empty(),
            _ => {}
        }
    }

    Ok((input, images))
}

/// Store uploaded files and return their public URLs.
async fn store_images(state: &AppState, images: &[UploadedImage]) -> Result<Vec<String>, AppError> {
    let mut urls = Vec::with_capacity(images.len());
    for image in images {
        urls.push(state.images().save(&image.file_name, &image.data).await?);
    }
    Ok(urls)
}

/// Display the seller dashboard.
///
/// Users without a vendor account see a link to the application form.
///
/// # Errors
///
/// Returns `AppError` if the vendor's data cannot be loaded.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let vendors = VendorService::new(state.pool(), state.catalog());
    let vendor = vendors.for_owner(user.id).await?;

    let (products, orders, payouts) = match &vendor {
        Some(vendor) => (
            ProductRepository::new(state.pool())
                .list_by_vendor(vendor.id)
                .await?,
            OrderRepository::new(state.pool())
                .list_by_vendor(vendor.id)
                .await?,
            PayoutRepository::new(state.pool())
                .list_by_vendor(vendor.id)
                .await?,
        ),
        None => (Vec::new(), Vec::new(), Vec::new()),
    };

    Ok(DashboardTemplate {
        nav: Nav::new(Some(&user)),
        vendor: vendor.as_ref().map(VendorView::from),
        products: ProductView::list(&products, DEFAULT_LOCALE),
        orders: orders.iter().map(OrderView::from).collect(),
        payouts: payouts.iter().map(PayoutView::from).collect(),
        error: query.error.as_deref().map(error_message),
        success: query.success.as_deref().map(success_message),
    })
}

/// Display the seller application form.
///
/// # Errors
///
/// Returns `AppError::Vendor` if the lookup fails.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn apply_page(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Response, AppError> {
    let vendors = VendorService::new(state.pool(), state.catalog());
    if vendors.for_owner(user.id).await?.is_some() {
        return Ok(Redirect::to("/seller").into_response());
    }

    Ok(ApplyTemplate {
        nav: Nav::new(Some(&user)),
        form: VendorApplication::default(),
        error: None,
    }
    .into_response())
}

/// Submit a seller application.
///
/// # Errors
///
/// Returns `AppError::Vendor` on database failures.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn apply(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<VendorApplication>,
) -> Result<Response, AppError> {
    let vendors = VendorService::new(state.pool(), state.catalog());
    match vendors.apply(user.id, &form).await {
        Ok(_) => Ok(Redirect::to("/seller?success=applied").into_response()),
        Err(VendorError::AlreadyApplied) => {
            Ok(Redirect::to("/seller?error=already_applied").into_response())
        }
        Err(VendorError::Invalid(message)) => Ok((
            StatusCode::BAD_REQUEST,
            ApplyTemplate {
                nav: Nav::new(Some(&user)),
                form,
                error: Some(message),
            },
        )
            .into_response()),
        Err(err) => Err(err.into()),
    }
}

/// Display the new product form.
///
/// # Errors
///
/// Returns `AppError::Vendor` (403) unless the user is an approved vendor.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn new_product_page(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, AppError> {
    VendorService::new(state.pool(), state.catalog())
        .require_seller(user.id)
        .await?;

    Ok(ProductFormTemplate::new_product(
        &user,
        state.config().default_currency.to_string(),
        ProductInput {
            stock: "1".to_string(),
            is_active: true,
            ..ProductInput::default()
        },
    ))
}

/// Create a product from the multipart form.
///
/// # Errors
///
/// Returns `AppError::Vendor` (403) unless the user is an approved vendor,
/// or `AppError::Upload` for rejected image files.
#[instrument(skip(state, user, multipart), fields(user_id = %user.id))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let vendors = VendorService::new(state.pool(), state.catalog());
    let vendor = vendors.require_seller(user.id).await?;
    let (input, images) = read_product_form(multipart).await?;
    let currency = state.config().default_currency;

    let mut draft = match input.clone().into_draft(currency, None, Vec::new()) {
        Ok(draft) => draft,
        Err(VendorError::Invalid(message)) => {
            let page = ProductFormTemplate::new_product(&user, currency.to_string(), input)
                .with_error(message);
            return Ok((StatusCode::BAD_REQUEST, page).into_response());
        }
        Err(err) => return Err(err.into()),
    };
    draft.images.extend(store_images(&state, &images).await?);

    let product = vendors.create_product(&vendor, &draft).await?;
    tracing::info!(product_id = %product.id, images = images.len(), "Seller created product");
    Ok(Redirect::to("/seller?success=product_saved").into_response())
}

/// Display the edit form for one of the vendor's products.
///
/// # Errors
///
/// Returns `AppError::Vendor` (403/404) unless the product belongs to the
/// user's approved vendor.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn edit_product_page(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<impl IntoResponse, AppError> {
    let vendors = VendorService::new(state.pool(), state.catalog());
    let vendor = vendors.require_seller(user.id).await?;
    let product = vendors.owned_product(&vendor, product_id).await?;

    Ok(ProductFormTemplate::edit_product(
        &user,
        &product,
        ProductInput::from_product(&product),
    ))
}

/// Save changes to one of the vendor's products.
///
/// New image files are appended to the existing ones.
///
/// # Errors
///
/// Returns `AppError::Vendor` (403/404) unless the product belongs to the
/// user's approved vendor, or `AppError::Upload` for rejected image files.
#[instrument(skip(state, user, multipart), fields(user_id = %user.id))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let vendors = VendorService::new(state.pool(), state.catalog());
    let vendor = vendors.require_seller(user.id).await?;
    let existing = vendors.owned_product(&vendor, product_id).await?;
    let (input, images) = read_product_form(multipart).await?;

    let mut draft =
        match input
            .clone()
            .into_draft(existing.price.currency, Some(&existing), Vec::new())
        {
            Ok(draft) => draft,
            Err(VendorError::Invalid(message)) => {
                let page =
                    ProductFormTemplate::edit_product(&user, &existing, input).with_error(message);
                return Ok((StatusCode::BAD_REQUEST, page).into_response());
            }
            Err(err) => return Err(err.into()),
        };
    draft.images.extend(store_images(&state, &images).await?);

    vendors.update_product(&vendor, product_id, &draft).await?;
    Ok(Redirect::to("/seller?success=product_saved").into_response())
}
