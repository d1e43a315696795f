//! Hosted payment pages and payment webhooks.
//!
//! Checkout talks to a [`PaymentGateway`]; the production implementation
//! is [`StripeGateway`]. Payment confirmation arrives asynchronously as a
//! signed webhook, handled by [`webhook`].

pub mod stripe;
pub mod webhook;

use async_trait::async_trait;
use thiserror::Error;

use handicrafts_core::{CurrencyCode, OrderId};

pub use stripe::StripeGateway;

/// Errors from the payment provider.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Network or TLS failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider rejected the request.
    #[error("provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    /// The provider answered with something unexpected.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

/// One line on the hosted payment page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLineItem {
    pub name: String,
    /// Unit price in minor units.
    pub unit_amount_minor: i64,
    pub quantity: u32,
}

/// Everything the gateway needs to open a hosted payment page.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub currency: CurrencyCode,
    pub line_items: Vec<CheckoutLineItem>,
    pub success_url: String,
    pub cancel_url: String,
    pub customer_email: Option<String>,
    /// Echoed back in the webhook as `metadata.order_ids`.
    pub order_ids: Vec<OrderId>,
}

/// A hosted payment page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    /// Provider session ID, stored on the orders.
    pub id: String,
    /// Where to send the customer.
    pub url: String,
}

/// Creates hosted payment pages.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a payment page for the given line items.
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError>;
}

/// Render order IDs for session metadata (`"3,4"`).
#[must_use]
pub fn encode_order_ids(ids: &[OrderId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse order IDs from session metadata, skipping anything malformed.
#[must_use]
pub fn decode_order_ids(raw: &str) -> Vec<OrderId> {
    raw.split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect()
}
