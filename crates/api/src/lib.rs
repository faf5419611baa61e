//! BookShop back-office API.
//!
//! JWT-authenticated HTTP endpoints for customers, the product catalog,
//! per-customer carts and checkout. The binary in `main.rs` wires
//! configuration, logging and Sentry around [`routes::app`]; everything else
//! lives here so integration tests can drive the same router.
//!
//! # Architecture
//!
//! - `db` - Store traits with `PostgreSQL` and in-memory implementations
//! - `services` - Identity, account, catalog, cart, checkout and email logic
//! - `middleware` - Request IDs and bearer token extractors
//! - `routes` - Axum handlers and JSON shapes

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use state::AppState;
