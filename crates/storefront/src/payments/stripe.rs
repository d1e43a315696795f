//! Stripe Checkout over the REST API.
//!
//! Requests are form-encoded and authenticated with the secret key as the
//! basic-auth username. Amounts are sent in minor units.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{CheckoutRequest, CheckoutSession, PaymentError, PaymentGateway, encode_order_ids};

const STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Stripe-hosted checkout.
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: SecretString,
    api_base: String,
}

impl StripeGateway {
    #[must_use]
    pub fn new(secret_key: SecretString) -> Self {
        Self::with_api_base(secret_key, STRIPE_API_BASE)
    }

    /// Point the gateway at a different API host (e.g. `stripe-mock`).
    #[must_use]
    pub fn with_api_base(secret_key: SecretString, api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[tracing::instrument(skip(self, request), fields(orders = request.order_ids.len()))]
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .basic_auth(self.secret_key.expose_secret(), None::<&str>)
            .form(&checkout_form(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or_else(|| status.to_string());
            tracing::error!(status = status.as_u16(), %message, "Stripe rejected checkout session");
            return Err(PaymentError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let session: SessionResponse = response.json().await?;
        let url = session
            .url
            .ok_or_else(|| PaymentError::InvalidResponse("checkout session has no url".into()))?;

        tracing::info!(session_id = %session.id, "Created Stripe checkout session");
        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }
}

/// Form fields for `POST /v1/checkout/sessions`.
fn checkout_form(request: &CheckoutRequest) -> Vec<(String, String)> {
    let currency = request.currency.code().to_ascii_lowercase();
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        (
            "metadata[order_ids]".to_string(),
            encode_order_ids(&request.order_ids),
        ),
    ];

    if let Some(email) = &request.customer_email {
        form.push(("customer_email".to_string(), email.clone()));
    }

    for (i, item) in request.line_items.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        form.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
        form.push((format!("{prefix}[price_data][currency]"), currency.clone()));
        form.push((
            format!("{prefix}[price_data][unit_amount]"),
            item.unit_amount_minor.to_string(),
        ));
        form.push((
            format!("{prefix}[price_data][product_data][name]"),
            item.name.clone(),
        ));
    }

    form
}
