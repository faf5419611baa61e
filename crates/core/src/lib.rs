//! BookShop Core - Shared domain types.
//!
//! This crate provides the value types used across the BookShop workspace:
//! - `api` - HTTP back-office service (customers, catalog, carts, checkout)
//! - `cli` - Migrations, catalog seeding and operator tooling
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP.
//! Validation that can be decided from a value alone (an email's shape, a
//! quantity's sign, a price's sign) lives here so every caller gets it.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, roles, prices and quantities

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
