//! Integration test harness for the handicrafts marketplace.
//!
//! Each [`TestApp`] builds the full storefront router over a private
//! in-memory database and drives it with `tower::ServiceExt::oneshot`, so
//! no server or network is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p handicrafts-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use http_body_util::BodyExt;
use secrecy::SecretString;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

use handicrafts_core::{CurrencyCode, Email, LocalizedText, Money, OrderId, VendorStatus};
use handicrafts_storefront::config::{StorefrontConfig, StripeConfig};
use handicrafts_storefront::db::{self, ProductRepository, UserRepository, VendorRepository};
use handicrafts_storefront::models::{Product, ProductDraft, User, Vendor};
use handicrafts_storefront::payments::webhook::{SIGNATURE_HEADER, sign};
use handicrafts_storefront::payments::{
    CheckoutRequest, CheckoutSession, PaymentError, PaymentGateway,
};
use handicrafts_storefront::services::AuthService;
use handicrafts_storefront::state::AppState;

/// Webhook secret configured on every test app.
pub const WEBHOOK_SECRET: &str = "whsec_integration_test";

/// Password used for every account created by the helpers.
pub const PASSWORD: &str = "woven-by-hand-42";

const SECRET_KEY: &str = "integration-test-signing-key-4f9a2c7e1b8d6053";

/// Every request gets its own client address so the per-IP rate limiters
/// never trip across tests.
static NEXT_IP: AtomicU32 = AtomicU32::new(1);

fn next_ip() -> String {
    let n = NEXT_IP.fetch_add(1, Ordering::Relaxed);
    format!("10.{}.{}.{}", (n >> 16) & 0xff, (n >> 8) & 0xff, n & 0xff)
}

/// Payment gateway that records requests and hands out fake sessions.
#[derive(Default)]
pub struct FakeGateway {
    pub requests: Mutex<Vec<CheckoutRequest>>,
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());
        let id = format!("cs_test_{}", requests.len());
        Ok(CheckoutSession {
            url: format!("https://checkout.stripe.test/pay/{id}"),
            id,
        })
    }
}

/// The storefront wired to an in-memory database and a fake gateway.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub gateway: Arc<FakeGateway>,
    _uploads: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let config = StorefrontConfig {
            stripe: Some(StripeConfig {
                secret_key: SecretString::from("sk_test_integration"),
                publishable_key: None,
                webhook_secret: SecretString::from(WEBHOOK_SECRET),
            }),
            upload_dir: uploads.path().to_path_buf(),
            ..StorefrontConfig::with_defaults(SecretString::from(SECRET_KEY))
        };

        let pool = db::create_memory_pool().await.unwrap();
        db::migrate(&pool).await.unwrap();

        let gateway = Arc::new(FakeGateway::default());
        let state = AppState::with_gateway(
            config,
            pool,
            Some(gateway.clone() as Arc<dyn PaymentGateway>),
        );
        let router = handicrafts_storefront::app::build(state.clone())
            .await
            .unwrap();

        Self {
            router,
            state,
            gateway,
            _uploads: uploads,
        }
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        self.state.pool()
    }

    /// A browser with an empty cookie jar.
    #[must_use]
    pub fn client(&self) -> Client {
        Client {
            router: self.router.clone(),
            cookies: Vec::new(),
        }
    }

    /// Register an account through the site and return a signed-in client.
    pub async fn signed_in(&self, name: &str, email: &str) -> Client {
        let mut client = self.client();
        let response = client
            .post_form(
                "/register",
                &[
                    ("name", name),
                    ("email", email),
                    ("password", PASSWORD),
                    ("password_confirm", PASSWORD),
                ],
            )
            .await;
        assert_eq!(response.location(), Some("/"), "registration failed");
        client
    }

    pub async fn user(&self, email: &str) -> User {
        UserRepository::new(self.pool())
            .get_by_email(&Email::parse(email).unwrap())
            .await
            .unwrap()
            .unwrap()
    }

    /// An account owning a vendor in the given status.
    pub async fn vendor(&self, owner_email: &str, name: &str, status: VendorStatus) -> Vendor {
        let owner = AuthService::new(self.pool())
            .register(name, owner_email, PASSWORD)
            .await
            .unwrap();
        let vendors = VendorRepository::new(self.pool());
        let vendor = vendors
            .create(owner.id, name, "Handmade goods", "UPI: shop@upi")
            .await
            .unwrap();
        if status == VendorStatus::Pending {
            return vendor;
        }
        vendors.set_status(vendor.id, status).await.unwrap()
    }

    /// A listed product priced in rupees.
    pub async fn product(&self, vendor: &Vendor, title: &str, rupees: i64, stock: i64) -> Product {
        let draft = ProductDraft {
            title: LocalizedText::new(title),
            description: LocalizedText::new(format!("{title}, made by {}", vendor.name)),
            category: "Home Decor".to_string(),
            price: Money::new(rupees * 100, CurrencyCode::Inr),
            stock,
            images: Vec::new(),
            is_active: true,
        };
        let product = ProductRepository::new(self.pool())
            .create(vendor.id, &draft)
            .await
            .unwrap();
        self.state.catalog().invalidate().await;
        product
    }

    pub async fn reload_product(&self, product: &Product) -> Product {
        ProductRepository::new(self.pool())
            .get_by_id(product.id)
            .await
            .unwrap()
            .unwrap()
    }
}

/// A signed `checkout.session.completed` event for a paid session.
#[must_use]
pub fn completed_event(event_id: &str, session_id: &str, order_ids: &[OrderId]) -> String {
    let ids = order_ids
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    serde_json::json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": session_id,
            "payment_status": "paid",
            "metadata": { "order_ids": ids },
        }},
    })
    .to_string()
}

/// Signature header for `payload`, valid now.
#[must_use]
pub fn signature(payload: &str) -> String {
    sign(payload.as_bytes(), WEBHOOK_SECRET, chrono::Utc::now().timestamp())
}

/// A buffered response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// Redirect target, if any.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// One browser: a router handle plus a cookie jar.
pub struct Client {
    router: Router,
    cookies: Vec<(String, String)>,
}

impl Client {
    pub async fn get(&mut self, path: &str) -> TestResponse {
        let request = self.request("GET", path).body(Body::empty()).unwrap();
        self.send(request).await
    }

    pub async fn post_form(&mut self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let request = self
            .request("POST", path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    pub async fn post_raw(
        &mut self,
        path: &str,
        body: impl Into<Body>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = self.request("POST", path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(body.into()).unwrap();
        self.send(request).await
    }

    /// Send a `multipart/form-data` body with text fields and optional
    /// `(field, file name, bytes)` files.
    pub async fn post_multipart(
        &mut self,
        path: &str,
        fields: &[(&str, &str)],
        files: &[(&str, &str, &[u8])],
    ) -> TestResponse {
        const BOUNDARY: &str = "----handicrafts-test-boundary";
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        for (name, file_name, data) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let request = self
            .request("POST", path)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Whether the jar holds a session cookie.
    #[must_use]
    pub fn has_session(&self) -> bool {
        !self.cookies.is_empty()
    }

    fn request(&self, method: &str, path: &str) -> axum::http::request::Builder {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("x-forwarded-for", next_ip());
        if !self.cookies.is_empty() {
            let cookie = self
                .cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(header::COOKIE, cookie);
        }
        builder
    }

    async fn send(&mut self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        for set_cookie in headers.get_all(header::SET_COOKIE) {
            self.store_cookie(set_cookie.to_str().unwrap());
        }
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    fn store_cookie(&mut self, raw: &str) {
        let mut parts = raw.split(';');
        let Some((name, value)) = parts.next().and_then(|kv| kv.trim().split_once('=')) else {
            return;
        };
        let expired = parts.any(|attr| {
            let attr = attr.trim().to_ascii_lowercase();
            attr == "max-age=0" || attr.starts_with("expires=thu, 01 jan 1970")
        });
        self.cookies.retain(|(k, _)| k != name);
        if !expired {
            self.cookies.push((name.to_string(), value.to_string()));
        }
    }
}

/// Header list for a webhook delivery.
#[must_use]
pub fn webhook_headers(signature: &str) -> [(&'static str, &str); 2] {
    [
        (SIGNATURE_HEADER, signature),
        ("content-type", "application/json"),
    ]
}
