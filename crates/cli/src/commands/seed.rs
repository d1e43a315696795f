//! Demo data for local development.
//!
//! Creates (or reuses) a demo account, gives it an approved vendor, and
//! lists two products. Running it again adds nothing.

use sqlx::SqlitePool;

use handicrafts_core::{CurrencyCode, Email, LocalizedText, Money, VendorStatus};
use handicrafts_storefront::db::{ProductRepository, UserRepository, VendorRepository};
use handicrafts_storefront::models::{ProductDraft, User};
use handicrafts_storefront::services::auth::AuthService;

use super::CommandError;

/// Owner account of the demo vendor.
pub const DEMO_EMAIL: &str = "artisan@example.com";

/// Password given to the demo account when it is created.
pub const DEMO_PASSWORD: &str = "handmade-demo-1";

const DEMO_VENDOR: &str = "Village Crafts Collective";

/// Title, description, category, price in paise, stock.
const DEMO_PRODUCTS: &[(&str, &str, &str, i64, i64)] = &[
    (
        "Handmade Bamboo Basket",
        "Woven by hand from sustainably harvested bamboo.",
        "Baskets",
        29_900,
        25,
    ),
    (
        "Terracotta Vase",
        "Wheel-thrown and sun-dried red clay vase.",
        "Pottery",
        59_900,
        12,
    ),
];

/// Insert the demo vendor and products.
///
/// # Errors
///
/// Returns `CommandError` if the account cannot be created or a write fails.
pub async fn demo(pool: &SqlitePool, email: &str, password: &str) -> Result<(), CommandError> {
    let owner = demo_owner(pool, email, password).await?;

    let vendors = VendorRepository::new(pool);
    if let Some(existing) = vendors.get_by_owner(owner.id).await? {
        tracing::info!(vendor_id = %existing.id, "Demo vendor already exists, nothing to do");
        return Ok(());
    }

    let vendor = vendors
        .create(
            owner.id,
            DEMO_VENDOR,
            "Artisans from rural Karnataka selling their own work.",
            "UPI: villagecrafts@upi",
        )
        .await?;
    let vendor = vendors.set_status(vendor.id, VendorStatus::Approved).await?;
    tracing::info!(vendor_id = %vendor.id, name = %vendor.name, "Created approved vendor");

    let products = ProductRepository::new(pool);
    for (title, description, category, price, stock) in DEMO_PRODUCTS {
        let draft = ProductDraft {
            title: LocalizedText::new(*title),
            description: LocalizedText::new(*description),
            category: (*category).to_owned(),
            price: Money::new(*price, CurrencyCode::Inr),
            stock: *stock,
            images: Vec::new(),
            is_active: true,
        };
        let product = products.create(vendor.id, &draft).await?;
        tracing::info!(product_id = %product.id, %title, price = %product.price, "Listed product");
    }

    tracing::info!("Seeding complete! Log in as {email} to manage the demo shop.");
    Ok(())
}

async fn demo_owner(pool: &SqlitePool, email: &str, password: &str) -> Result<User, CommandError> {
    let parsed = Email::parse(email)?;
    if let Some(user) = UserRepository::new(pool).get_by_email(&parsed).await? {
        return Ok(user);
    }

    let user = AuthService::new(pool)
        .register("Demo Artisan", email, password)
        .await?;
    tracing::info!(user_id = %user.id, %email, "Created demo account");
    Ok(user)
}
