//! Stripe webhook verification and event parsing.
//!
//! The `Stripe-Signature` header has the form `t=<unix>,v1=<hex>[,v1=...]`.
//! Each `v1` value is an HMAC-SHA256 of `"{t}.{body}"` keyed with the
//! endpoint secret. Deliveries older (or newer) than [`TOLERANCE_SECS`] are
//! rejected.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use handicrafts_core::OrderId;

use super::decode_order_ids;
use crate::db::payments::PaymentConfirmation;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Allowed clock skew between signing and receipt, in seconds.
pub const TOLERANCE_SECS: i64 = 300;

/// Event sent when a customer finishes the hosted checkout.
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// Event sent when a delayed payment method settles.
pub const ASYNC_PAYMENT_SUCCEEDED: &str = "checkout.session.async_payment_succeeded";

type HmacSha256 = Hmac<Sha256>;

/// Reasons a webhook delivery is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("missing signature header")]
    MissingSignature,

    #[error("malformed signature header")]
    MalformedSignature,

    #[error("signature mismatch")]
    SignatureMismatch,

    #[error("timestamp outside tolerance")]
    StaleTimestamp,

    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

/// Check a delivery's signature against the endpoint secret.
///
/// `now` is the current Unix time in seconds.
///
/// # Errors
///
/// Returns `WebhookError` describing why the signature is not acceptable.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = Some(t);
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::MalformedSignature)?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedSignature);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| WebhookError::MalformedSignature)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    // Constant-time comparison against every v1 value (secret rotation
    // sends more than one).
    let matched = signatures.iter().any(|sig| {
        hex::decode(sig).is_ok_and(|bytes| mac.clone().verify_slice(&bytes).is_ok())
    });
    if !matched {
        return Err(WebhookError::SignatureMismatch);
    }

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| WebhookError::MalformedSignature)?;
    if (now - ts).abs() > TOLERANCE_SECS {
        return Err(WebhookError::StaleTimestamp);
    }

    Ok(())
}

/// Build a `Stripe-Signature` header value for `payload`.
///
/// Used by tests and local tooling to produce deliveries the handler accepts.
#[must_use]
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        // HMAC accepts keys of any length.
        Err(_) => return format!("t={timestamp}"),
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    )
}

/// The parts of a webhook event this application reads.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: CheckoutSessionObject,
}

/// Checkout session as embedded in an event. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutSessionObject {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub order_ids: Option<String>,
}

/// Parse a verified delivery body.
///
/// # Errors
///
/// Returns `WebhookError::InvalidPayload` for malformed JSON or a missing
/// event ID.
pub fn parse_event(payload: &[u8]) -> Result<WebhookEvent, WebhookError> {
    let event: WebhookEvent =
        serde_json::from_slice(payload).map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;
    if event.id.trim().is_empty() {
        return Err(WebhookError::InvalidPayload("missing event id".to_string()));
    }
    Ok(event)
}

/// A confirmed payment extracted from an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedPayment {
    pub event_id: String,
    pub event_type: String,
    pub checkout_session_id: Option<String>,
    pub order_ids: Vec<OrderId>,
}

impl ConfirmedPayment {
    #[must_use]
    pub fn as_confirmation(&self) -> PaymentConfirmation<'_> {
        PaymentConfirmation {
            event_id: &self.event_id,
            event_type: &self.event_type,
            checkout_session_id: self.checkout_session_id.as_deref(),
            order_ids: &self.order_ids,
        }
    }
}

impl WebhookEvent {
    /// The confirmed payment this event reports, if any.
    ///
    /// `checkout.session.completed` only counts once the session is `paid`;
    /// delayed methods complete unpaid and confirm later with
    /// `checkout.session.async_payment_succeeded`.
    #[must_use]
    pub fn confirmed_payment(&self) -> Option<ConfirmedPayment> {
        let object = &self.data.object;
        let confirmed = match self.event_type.as_str() {
            CHECKOUT_COMPLETED => object.payment_status.as_deref() == Some("paid"),
            ASYNC_PAYMENT_SUCCEEDED => true,
            _ => false,
        };
        if !confirmed {
            return None;
        }

        Some(ConfirmedPayment {
            event_id: self.id.clone(),
            event_type: self.event_type.clone(),
            checkout_session_id: object.id.clone(),
            order_ids: object
                .metadata
                .as_ref()
                .and_then(|m| m.order_ids.as_deref())
                .map(decode_order_ids)
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_700_000_000;

    fn completed(payment_status: &str) -> Vec<u8> {
        format!(
            r#"{{"id":"evt_1","type":"checkout.session.completed","data":{{"object":{{"id":"cs_test_1","payment_status":"{payment_status}","metadata":{{"order_ids":"5,6"}}}}}}}}"#
        )
        .into_bytes()
    }

    #[test]
    fn test_valid_signature_accepted() {
        let body = completed("paid");
        let header = sign(&body, SECRET, NOW);
        assert_eq!(verify_signature(&body, &header, SECRET, NOW + 10), Ok(()));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let body = completed("paid");
        let header = sign(&body, SECRET, NOW);
        assert_eq!(
            verify_signature(&completed("unpaid"), &header, SECRET, NOW),
            Err(WebhookError::SignatureMismatch)
        );
        assert_eq!(
            verify_signature(&body, &header, "whsec_other", NOW),
            Err(WebhookError::SignatureMismatch)
        );
    }

    #[test]
    fn test_stale_and_malformed_headers() {
        let body = completed("paid");
        let header = sign(&body, SECRET, NOW);
        assert_eq!(
            verify_signature(&body, &header, SECRET, NOW + TOLERANCE_SECS + 1),
            Err(WebhookError::StaleTimestamp)
        );
        assert_eq!(
            verify_signature(&body, "v1=abcd", SECRET, NOW),
            Err(WebhookError::MalformedSignature)
        );
        assert_eq!(
            verify_signature(&body, &format!("t={NOW}"), SECRET, NOW),
            Err(WebhookError::MalformedSignature)
        );
        assert_eq!(
            verify_signature(&body, &format!("t={NOW},v1=zz"), SECRET, NOW),
            Err(WebhookError::SignatureMismatch)
        );
    }

    #[test]
    fn test_any_v1_signature_may_match() {
        let body = completed("paid");
        let good = sign(&body, SECRET, NOW);
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t={NOW},v1={},v1={good_sig}", "00".repeat(32));
        assert_eq!(verify_signature(&body, &header, SECRET, NOW), Ok(()));
    }

    #[test]
    fn test_confirmed_payment_from_completed_session() {
        let event = parse_event(&completed("paid")).unwrap();
        let payment = event.confirmed_payment().unwrap();
        assert_eq!(payment.event_id, "evt_1");
        assert_eq!(payment.checkout_session_id.as_deref(), Some("cs_test_1"));
        assert_eq!(payment.order_ids, vec![OrderId::new(5), OrderId::new(6)]);

        let unpaid = parse_event(&completed("unpaid")).unwrap();
        assert!(unpaid.confirmed_payment().is_none());
    }

    #[test]
    fn test_delayed_payment_confirms_when_it_succeeds() {
        let body = br#"{"id":"evt_9","type":"checkout.session.async_payment_succeeded","data":{"object":{"id":"cs_test_9","payment_status":"paid","metadata":{"order_ids":"7"}}}}"#;
        let payment = parse_event(body).unwrap().confirmed_payment().unwrap();
        assert_eq!(payment.event_type, ASYNC_PAYMENT_SUCCEEDED);
        assert_eq!(payment.checkout_session_id.as_deref(), Some("cs_test_9"));
        assert_eq!(payment.order_ids, vec![OrderId::new(7)]);

        let no_metadata = br#"{"id":"evt_10","type":"checkout.session.async_payment_succeeded","data":{"object":{"id":"cs_test_10"}}}"#;
        let payment = parse_event(no_metadata).unwrap().confirmed_payment().unwrap();
        assert_eq!(payment.checkout_session_id.as_deref(), Some("cs_test_10"));
        assert!(payment.order_ids.is_empty());

        let failed = br#"{"id":"evt_11","type":"checkout.session.async_payment_failed","data":{"object":{"id":"cs_test_11"}}}"#;
        assert!(parse_event(failed).unwrap().confirmed_payment().is_none());
    }

    #[test]
    fn test_other_events_ignored_and_bad_json_rejected() {
        let refund = br#"{"id":"evt_2","type":"charge.refunded","data":{"object":{}}}"#;
        assert!(parse_event(refund).unwrap().confirmed_payment().is_none());

        assert!(matches!(
            parse_event(b"not json"),
            Err(WebhookError::InvalidPayload(_))
        ));
        assert!(matches!(
            parse_event(br#"{"id":"","type":"x","data":{"object":{}}}"#),
            Err(WebhookError::InvalidPayload(_))
        ));
    }
}
