//! Admin route handlers.
//!
//! Every handler takes [`RequireAdmin`], which re-checks the admin flag
//! against the database.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect},
};
use tracing::instrument;

use handicrafts_core::{OrderId, OrderStatus, PayoutId, VendorId, VendorStatus};

use super::views::{Nav, OrderView, PayoutView, VendorView};
use crate::db::{OrderRepository, PayoutRepository, VendorRepository};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::services::VendorService;
use crate::state::AppState;

/// Admin dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct AdminTemplate {
    pub nav: Nav,
    pub vendors: Vec<VendorView>,
    pub orders: Vec<OrderView>,
    pub payouts: Vec<PayoutView>,
}

/// Display vendors, orders and payouts.
///
/// # Errors
///
/// Returns `AppError::Database` if any list cannot be loaded.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<impl IntoResponse, AppError> {
    let vendors = VendorRepository::new(state.pool()).list_all().await?;
    let orders = OrderRepository::new(state.pool()).list_all().await?;
    let payouts = PayoutRepository::new(state.pool()).list_all().await?;

    Ok(AdminTemplate {
        nav: Nav::new(Some(&admin)),
        vendors: vendors.iter().map(VendorView::from).collect(),
        orders: orders.iter().map(OrderView::from).collect(),
        payouts: payouts.iter().map(PayoutView::from).collect(),
    })
}

async fn decide_vendor(
    state: &AppState,
    vendor_id: VendorId,
    to: VendorStatus,
) -> Result<Redirect, AppError> {
    VendorService::new(state.pool(), state.catalog())
        .decide(vendor_id, to)
        .await?;
    Ok(Redirect::to("/admin"))
}

/// # Errors
///
/// Returns `AppError::Vendor` if the vendor doesn't exist or is already approved.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn approve_vendor(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(vendor_id): Path<VendorId>,
) -> Result<Redirect, AppError> {
    decide_vendor(&state, vendor_id, VendorStatus::Approved).await
}

/// # Errors
///
/// Returns `AppError::Vendor` if the vendor doesn't exist or is already rejected.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn reject_vendor(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(vendor_id): Path<VendorId>,
) -> Result<Redirect, AppError> {
    decide_vendor(&state, vendor_id, VendorStatus::Rejected).await
}

/// Mark a paid order as shipped.
///
/// # Errors
///
/// Returns 404 for an unknown order and 409 unless the order is `PAID`.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn ship_order(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(order_id): Path<OrderId>,
) -> Result<Redirect, AppError> {
    OrderRepository::new(state.pool())
        .transition(order_id, OrderStatus::Paid, OrderStatus::Shipped)
        .await?;
    tracing::info!(%order_id, "Order shipped");
    Ok(Redirect::to("/admin"))
}

/// Cancel an unpaid order.
///
/// # Errors
///
/// Returns 404 for an unknown order and 409 unless the order is `PENDING`.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn cancel_order(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(order_id): Path<OrderId>,
) -> Result<Redirect, AppError> {
    OrderRepository::new(state.pool())
        .transition(order_id, OrderStatus::Pending, OrderStatus::Cancelled)
        .await?;
    tracing::info!(%order_id, "Order cancelled");
    Ok(Redirect::to("/admin"))
}

/// Record that a payout has been disbursed.
///
/// # Errors
///
/// Returns 404 for an unknown payout and 409 if it is already paid.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn mark_payout_paid(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(payout_id): Path<PayoutId>,
) -> Result<Redirect, AppError> {
    PayoutRepository::new(state.pool())
        .mark_paid(payout_id)
        .await?;
    tracing::info!(%payout_id, "Payout marked paid");
    Ok(Redirect::to("/admin"))
}
