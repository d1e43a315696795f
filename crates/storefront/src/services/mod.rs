//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Registration, login and profile changes (argon2 passwords)
//! - `cart` - Guest and saved carts, merged at login
//! - `catalog` - Cached product listing, search and suggestions
//! - `checkout` - Pending orders and the hosted payment handoff
//! - `uploads` - Product image storage
//! - `vendors` - Seller applications, admin review and product editing

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod uploads;
pub mod vendors;

pub use auth::{AuthError, AuthService};
pub use cart::{CartError, CartOwner, CartService};
pub use catalog::Catalog;
pub use checkout::{CheckoutError, CheckoutService};
pub use uploads::{ImageStore, UploadError};
pub use vendors::{VendorError, VendorService};
