//! Database migration command.
//!
//! Migrations live in `crates/storefront/migrations/` and are embedded in
//! the storefront crate at compile time.

use sqlx::SqlitePool;

use super::CommandError;

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns `CommandError::Migration` if a migration fails.
pub async fn run(pool: &SqlitePool) -> Result<(), CommandError> {
    tracing::info!("Running migrations...");
    handicrafts_storefront::db::migrate(pool).await?;
    tracing::info!("Migrations complete!");
    Ok(())
}
