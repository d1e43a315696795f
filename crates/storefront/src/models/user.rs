//! User domain types.

use chrono::{DateTime, Utc};

use handicrafts_core::{Email, UserId};

/// A marketplace account.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// User's email address (unique, lowercase).
    pub email: Email,
    /// Whether the user may open the admin area.
    pub is_admin: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}
