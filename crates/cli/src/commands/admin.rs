//! Administrator management.
//!
//! # Usage
//!
//! ```bash
//! hc-cli admin grant -e admin@example.com
//! hc-cli admin revoke -e admin@example.com
//! ```
//!
//! The account has to exist already; register it through the site first.

use sqlx::SqlitePool;

use handicrafts_core::Email;
use handicrafts_storefront::db::{RepositoryError, UserRepository};

use super::CommandError;

/// Set or clear the admin flag on an account.
///
/// # Errors
///
/// Returns `CommandError::InvalidEmail` for a malformed address and
/// `CommandError::UnknownUser` if no account uses it.
pub async fn set_admin(pool: &SqlitePool, email: &str, is_admin: bool) -> Result<(), CommandError> {
    let parsed = Email::parse(email)?;

    let user = match UserRepository::new(pool).set_admin(&parsed, is_admin).await {
        Ok(user) => user,
        Err(RepositoryError::NotFound) => return Err(CommandError::UnknownUser(email.to_owned())),
        Err(e) => return Err(e.into()),
    };

    if is_admin {
        tracing::info!(user_id = %user.id, email = %user.email, "Admin flag granted");
    } else {
        tracing::info!(user_id = %user.id, email = %user.email, "Admin flag revoked");
    }
    Ok(())
}
