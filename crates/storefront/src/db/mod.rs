//! Database operations for the storefront `SQLite` file.
//!
//! ## Tables
//!
//! - `users` - Accounts with argon2 password hashes and the admin flag
//! - `vendors` - Seller applications and their review status
//! - `products` - Listings owned by vendors (localized text stored as JSON)
//! - `cart_items` - Carts of signed-in users
//! - `wishlist_items` - Saved products
//! - `orders` - One row per vendor per checkout, with item and address snapshots
//! - `payouts` - Vendor share of each paid order (unique per order)
//! - `processed_webhook_events` - Idempotency keys for payment webhooks
//! - `tower_sessions` - Session storage, created by the session store
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p handicrafts-cli -- migrate
//! ```

pub mod carts;
pub mod orders;
pub mod payments;
pub mod payouts;
pub mod products;
pub mod users;
pub mod vendors;
pub mod wishlists;

use std::str::FromStr;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;

pub use carts::CartRepository;
pub use orders::OrderRepository;
pub use payments::PaymentRepository;
pub use payouts::PayoutRepository;
pub use products::ProductRepository;
pub use users::UserRepository;
pub use vendors::VendorRepository;
pub use wishlists::WishlistRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique-constraint violation to `RepositoryError::Conflict`.
pub(crate) fn conflict_on_unique(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(err)
}

/// Create a `SQLite` connection pool with sensible defaults.
///
/// The database file is created if missing. WAL mode lets page reads
/// proceed while a checkout or webhook transaction is writing.
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is invalid or the file cannot be opened.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url.expose_secret())?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}

/// Create a private in-memory database holding a single connection.
///
/// Every `:memory:` connection is its own database, so the pool never
/// opens a second one. Used by tests.
///
/// # Errors
///
/// Returns `sqlx::Error` if `SQLite` cannot be initialized.
pub async fn create_memory_pool() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
}

/// Apply all pending schema migrations.
///
/// # Errors
///
/// Returns `sqlx::migrate::MigrateError` if a migration fails.
pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_support {
    //! Fixtures for repository and service tests.

    use handicrafts_core::{CurrencyCode, Email, LocalizedText, Money, VendorId, VendorStatus};
    use sqlx::SqlitePool;

    use super::{ProductRepository, UserRepository, VendorRepository};
    use crate::models::{Product, ProductDraft, ShippingAddress, User, Vendor};

    /// A migrated in-memory database.
    pub async fn pool() -> SqlitePool {
        let pool = super::create_memory_pool().await.unwrap();
        super::migrate(&pool).await.unwrap();
        pool
    }

    pub async fn user(pool: &SqlitePool, email: &str) -> User {
        let email = Email::parse(email).unwrap();
        UserRepository::new(pool)
            .create(email.local_part(), &email, "not-a-real-hash")
            .await
            .unwrap()
    }

    pub async fn approved_vendor(pool: &SqlitePool, owner_email: &str) -> Vendor {
        let owner = user(pool, owner_email).await;
        let repo = VendorRepository::new(pool);
        let vendor = repo
            .create(owner.id, &format!("{} Crafts", owner.name), "", "")
            .await
            .unwrap();
        repo.set_status(vendor.id, VendorStatus::Approved)
            .await
            .unwrap()
    }

    pub fn draft(title: &str, price_minor: i64, stock: i64) -> ProductDraft {
        ProductDraft {
            title: LocalizedText::new(title),
            description: LocalizedText::new(format!("Handmade {title}")),
            category: "Home Decor".to_string(),
            price: Money::new(price_minor, CurrencyCode::Inr),
            stock,
            images: Vec::new(),
            is_active: true,
        }
    }

    pub async fn product(
        pool: &SqlitePool,
        vendor_id: VendorId,
        title: &str,
        price_minor: i64,
        stock: i64,
    ) -> Product {
        ProductRepository::new(pool)
            .create(vendor_id, &draft(title, price_minor, stock))
            .await
            .unwrap()
    }

    pub fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Asha Rao".to_string(),
            line1: "12 Temple Road".to_string(),
            line2: String::new(),
            city: "Mysuru".to_string(),
            state: "Karnataka".to_string(),
            postal_code: "570001".to_string(),
            country: "India".to_string(),
            phone: String::new(),
        }
    }
}
