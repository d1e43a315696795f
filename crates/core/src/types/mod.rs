//! Core types for the Handicrafts marketplace.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod localized;
pub mod money;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use localized::{DEFAULT_LOCALE, LocalizedText};
pub use money::{CurrencyCode, Money, MoneyError, VENDOR_PAYOUT_PERCENT};
pub use status::*;
