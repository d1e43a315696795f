//! Handicrafts Core - Shared domain types.
//!
//! This crate provides the types used across all Handicrafts components:
//! - `storefront` - The marketplace web application
//! - `cli` - Command-line tools for migrations, seeding and administration
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP clients. Database encoding lives behind the `sqlite`
//! feature so the types stay usable anywhere.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, email, money, localized text and status enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
