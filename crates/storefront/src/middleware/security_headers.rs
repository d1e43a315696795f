//! Response hardening headers.
//!
//! Pages are locked down to same-origin scripts and styles. Product images
//! may come from uploads, `data:` URLs or absolute `https:` URLs given by
//! sellers, and forms may post to the hosted checkout page.

use axum::{
    extract::Request,
    http::{
        HeaderMap, HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

use crate::services::uploads::PUBLIC_PREFIX;

/// Content Security Policy for every response.
const CSP: &str = "default-src 'none'; \
                   script-src 'self'; \
                   style-src 'self'; \
                   img-src 'self' data: https:; \
                   connect-src 'self'; \
                   font-src 'self'; \
                   object-src 'none'; \
                   base-uri 'self'; \
                   form-action 'self' https://checkout.stripe.com; \
                   frame-ancestors 'none'";

/// Browser features the storefront never uses.
const PERMISSIONS_POLICY: &str = "camera=(), microphone=(), geolocation=(), payment=(), \
                                  usb=(), serial=(), hid=(), interest-cohort=(), \
                                  browsing-topics=()";

/// Caching for stylesheets, scripts and product images.
const ASSET_CACHE: &str = "public, max-age=3600";

/// Caching for pages, which may show the signed-in user's cart or orders.
const PAGE_CACHE: &str = "no-store";

/// Headers set regardless of path.
const FIXED: &[(&str, &str)] = &[
    ("permissions-policy", PERMISSIONS_POLICY),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
];

/// Add security headers to all responses.
///
/// `/static` and upload paths are cacheable; everything else is `no-store`.
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let cache = if is_asset(request.uri().path()) {
        ASSET_CACHE
    } else {
        PAGE_CACHE
    };

    let mut response = next.run(request).await;
    apply(response.headers_mut(), cache);
    response
}

fn is_asset(path: &str) -> bool {
    path.starts_with("/static/") || path.starts_with(&format!("{PUBLIC_PREFIX}/"))
}

fn apply(headers: &mut HeaderMap, cache: &'static str) {
    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(CONTENT_SECURITY_POLICY, HeaderValue::from_static(CSP));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(cache));

    for (name, value) in FIXED {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, http::Request, middleware::from_fn, routing::get};
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        Router::new()
            .route("/cart", get(|| async { "cart" }))
            .route("/static/css/main.css", get(|| async { "body {}" }))
            .layer(from_fn(security_headers_middleware))
    }

    async fn headers_for(path: &str) -> HeaderMap {
        let response = app()
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        response.headers().clone()
    }

    #[tokio::test]
    async fn test_pages_are_not_cached() {
        let headers = headers_for("/cart").await;
        assert_eq!(headers[CACHE_CONTROL], "no-store");
        assert_eq!(headers[X_FRAME_OPTIONS], "DENY");
        assert!(
            headers[CONTENT_SECURITY_POLICY]
                .to_str()
                .unwrap()
                .contains("form-action 'self' https://checkout.stripe.com")
        );
        assert_eq!(headers["cross-origin-opener-policy"], "same-origin");
    }

    #[tokio::test]
    async fn test_assets_are_cacheable() {
        let headers = headers_for("/static/css/main.css").await;
        assert_eq!(headers[CACHE_CONTROL], ASSET_CACHE);
        assert_eq!(headers[X_CONTENT_TYPE_OPTIONS], "nosniff");
    }

    #[test]
    fn test_upload_paths_count_as_assets() {
        assert!(is_asset("/uploads/3f2a.png"));
        assert!(!is_asset("/uploadsx"));
        assert!(!is_asset("/products/1"));
    }
}
