//! Domain models for the storefront.
//!
//! These types represent validated domain objects separate from database
//! row types, which live next to their repositories in `db`.

pub mod cart;
pub mod order;
pub mod payout;
pub mod product;
pub mod user;
pub mod vendor;

use serde::{Deserialize, Serialize};

use handicrafts_core::{Email, UserId};

pub use cart::{CartLine, SessionCart};
pub use order::{Order, OrderItem, ShippingAddress};
pub use payout::Payout;
pub use product::{Product, ProductDraft};
pub use user::User;
pub use vendor::Vendor;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user. The
/// admin flag is captured at login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// User's email address.
    pub email: Email,
    /// Whether the user may open the admin area.
    pub is_admin: bool,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            is_admin: user.is_admin,
        }
    }
}

/// Session keys.
pub mod session_keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the guest cart.
    pub const CART: &str = "cart";
}
