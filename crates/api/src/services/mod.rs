//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Password hashing and bearer tokens
//! - `account` - Registration, login, profile, password and role changes
//! - `catalog` - Products and categories
//! - `cart` - Per-customer cart engine
//! - `checkout` - Cart to receipt conversion
//! - `email` - Receipt rendering and delivery

pub mod account;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod email;
