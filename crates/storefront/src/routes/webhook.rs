//! Payment provider webhook.
//!
//! `POST /webhook` receives Stripe events. The signature is checked against
//! the raw body before anything is parsed. Confirmed payments are applied in
//! a single transaction keyed by event ID, so redeliveries are harmless.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use secrecy::ExposeSecret;
use tracing::instrument;

use crate::db::PaymentRepository;
use crate::db::payments::PaymentOutcome;
use crate::error::AppError;
use crate::payments::webhook::{SIGNATURE_HEADER, parse_event, verify_signature};
use crate::state::AppState;

/// Handle a webhook delivery.
///
/// Responds 400 for bad signatures or payloads, 200 for anything accepted
/// (including events we ignore and duplicates), and 500 if the database
/// write fails so the provider retries.
///
/// # Errors
///
/// Returns `AppError::Database` if the payment cannot be recorded.
#[instrument(skip(state, headers, body), fields(size = body.len()))]
pub async fn stripe(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let Some(stripe) = state.config().stripe.as_ref() else {
        tracing::warn!("Webhook received but payments are not configured");
        return Ok((StatusCode::SERVICE_UNAVAILABLE, "Payments are not configured").into_response());
    };

    let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) else {
        tracing::warn!("Webhook without signature header");
        return Ok((StatusCode::BAD_REQUEST, "Missing signature").into_response());
    };

    if let Err(e) = verify_signature(
        &body,
        signature,
        stripe.webhook_secret.expose_secret(),
        chrono::Utc::now().timestamp(),
    ) {
        tracing::warn!(error = %e, "Rejected webhook signature");
        return Ok((StatusCode::BAD_REQUEST, "Invalid signature").into_response());
    }

    let event = match parse_event(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected webhook payload");
            return Ok((StatusCode::BAD_REQUEST, "Invalid payload").into_response());
        }
    };

    let Some(payment) = event.confirmed_payment() else {
        tracing::debug!(event_id = %event.id, event_type = %event.event_type, "Ignoring webhook event");
        return Ok((StatusCode::OK, "ignored").into_response());
    };

    let outcome = PaymentRepository::new(state.pool())
        .apply(&payment.as_confirmation())
        .await?;

    match outcome {
        PaymentOutcome::Duplicate => {
            tracing::info!(event_id = %payment.event_id, "Duplicate webhook delivery");
        }
        PaymentOutcome::Applied { paid, skipped } => {
            if !skipped.is_empty() {
                tracing::warn!(?skipped, "Payment referenced orders that were not pending");
            }
            if !paid.is_empty() {
                // Stock changed.
                state.catalog().invalidate().await;
            }
            tracing::info!(event_id = %payment.event_id, ?paid, "Payment applied");
        }
    }

    Ok((StatusCode::OK, "ok").into_response())
}
