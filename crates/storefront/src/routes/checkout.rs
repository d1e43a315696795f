//! Checkout route handlers.
//!
//! `GET /checkout` shows the shipping form; `POST /checkout` creates the
//! pending orders and sends the customer to the hosted payment page. The
//! orders become `PAID` only when the payment webhook arrives.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use super::views::{CartView, Nav};
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, ShippingAddress};
use crate::services::{CartOwner, CartService, CheckoutError, CheckoutService};
use crate::state::AppState;

/// Checkout form template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/address.html")]
pub struct CheckoutTemplate {
    pub nav: Nav,
    pub cart: CartView,
    pub address: ShippingAddress,
    pub payments_enabled: bool,
    pub error: Option<String>,
}

/// Thank-you page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/success.html")]
pub struct CheckoutSuccessTemplate {
    pub nav: Nav,
    pub session_id: Option<String>,
}

/// Cancelled payment template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/cancel.html")]
pub struct CheckoutCancelTemplate {
    pub nav: Nav,
}

/// Return parameters from the payment page.
#[derive(Debug, Deserialize)]
pub struct SuccessQuery {
    pub session_id: Option<String>,
}

async fn checkout_page(
    state: &AppState,
    user: &CurrentUser,
    address: ShippingAddress,
    error: Option<String>,
) -> Result<CheckoutTemplate, AppError> {
    let summary = CartService::new(state.pool())
        .summary(CartOwner::User(user.id))
        .await?;
    Ok(CheckoutTemplate {
        nav: Nav::new(Some(user)),
        cart: CartView::from(&summary),
        address,
        payments_enabled: state.gateway().is_some(),
        error,
    })
}

/// Display the shipping address form.
///
/// # Errors
///
/// Returns `AppError::Cart` if the cart cannot be loaded.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Response, AppError> {
    let page = checkout_page(
        &state,
        &user,
        ShippingAddress {
            full_name: user.name.clone(),
            ..ShippingAddress::default()
        },
        None,
    )
    .await?;
    if page.cart.is_empty() {
        return Ok(Redirect::to("/cart").into_response());
    }
    Ok(page.into_response())
}

/// Create pending orders and redirect to the payment page.
///
/// # Errors
///
/// Returns `AppError::Checkout` when payments are disabled or the payment
/// provider fails.
#[instrument(skip(state, user, address), fields(user_id = %user.id))]
pub async fn submit(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(address): Form<ShippingAddress>,
) -> Result<Response, AppError> {
    let service = CheckoutService::new(state.pool(), state.config(), state.gateway());

    match service.start(&user, address.clone()).await {
        Ok(session) => {
            add_breadcrumb("checkout", "Redirected to payment", None);
            Ok(Redirect::to(&session.url).into_response())
        }
        Err(CheckoutError::EmptyCart) => Ok(Redirect::to("/cart").into_response()),
        Err(
            err @ (CheckoutError::InvalidAddress(_)
            | CheckoutError::Unavailable(_)
            | CheckoutError::MixedCurrencies),
        ) => {
            let status = if matches!(err, CheckoutError::Unavailable(_)) {
                StatusCode::CONFLICT
            } else {
                StatusCode::BAD_REQUEST
            };
            let page = checkout_page(&state, &user, address, Some(err.to_string())).await?;
            Ok((status, page).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

/// Landing page after a completed payment.
#[instrument(skip(user))]
pub async fn success(
    RequireAuth(user): RequireAuth,
    Query(query): Query<SuccessQuery>,
) -> impl IntoResponse {
    CheckoutSuccessTemplate {
        nav: Nav::new(Some(&user)),
        session_id: query.session_id,
    }
}

/// Landing page after the customer abandons payment.
pub async fn cancel(RequireAuth(user): RequireAuth) -> impl IntoResponse {
    CheckoutCancelTemplate {
        nav: Nav::new(Some(&user)),
    }
}
