//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::StorefrontConfig;
use crate::payments::{PaymentGateway, StripeGateway};
use crate::services::{Catalog, ImageStore};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: SqlitePool,
    catalog: Catalog,
    images: ImageStore,
    gateway: Option<Arc<dyn PaymentGateway>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The Stripe gateway is enabled when Stripe is configured.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `SQLite` connection pool
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: SqlitePool) -> Self {
        let gateway = config.stripe.as_ref().map(|stripe| {
            Arc::new(StripeGateway::new(stripe.secret_key.clone()))
                as Arc<dyn PaymentGateway>
        });
        Self::with_gateway(config, pool, gateway)
    }

    /// Create state with an explicit payment gateway (or none).
    #[must_use]
    pub fn with_gateway(
        config: StorefrontConfig,
        pool: SqlitePool,
        gateway: Option<Arc<dyn PaymentGateway>>,
    ) -> Self {
        let images = ImageStore::new(config.upload_dir.clone());
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                catalog: Catalog::new(),
                images,
                gateway,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    /// Get a reference to the cached product catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Get a reference to the product image store.
    #[must_use]
    pub fn images(&self) -> &ImageStore {
        &self.inner.images
    }

    /// The payment gateway, `None` when payments are disabled.
    #[must_use]
    pub fn gateway(&self) -> Option<&dyn PaymentGateway> {
        self.inner.gateway.as_deref()
    }
}
