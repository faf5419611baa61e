//! Persistence for the BookShop API.
//!
//! Storage is reached through three narrow traits, one per aggregate, bundled
//! into [`Store`]. Two implementations exist:
//!
//! - [`PgStore`] - `PostgreSQL` through sqlx (tables in the `bookshop` schema)
//! - [`MemoryStore`] - an in-process arena used by tests and `BOOKSHOP_STORE=memory`
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p bookshop-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use bookshop_core::{CartId, CartItemId, CategoryId, CustomerId, Email, ProductId, Quantity, Role};

use crate::models::{
    Cart, CartItem, CartLine, Category, Customer, NewCustomer, ProductDetails, ProductDraft,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Customer accounts.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// All customers ordered by id.
    async fn list_customers(&self) -> Result<Vec<Customer>, RepositoryError>;

    async fn customer_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError>;

    /// Case-insensitive username lookup.
    async fn customer_by_username(&self, username: &str)
    -> Result<Option<Customer>, RepositoryError>;

    async fn customer_by_email(&self, email: &Email) -> Result<Option<Customer>, RepositoryError>;

    /// Insert a customer.
    ///
    /// Returns `RepositoryError::Conflict` if the username (case-insensitive)
    /// or email is taken.
    async fn insert_customer(&self, customer: NewCustomer) -> Result<Customer, RepositoryError>;

    /// Replace username and email.
    ///
    /// Returns `RepositoryError::Conflict` if either collides with another
    /// customer and `RepositoryError::NotFound` if `id` does not exist.
    async fn update_profile(
        &self,
        id: CustomerId,
        username: &str,
        email: &Email,
    ) -> Result<Customer, RepositoryError>;

    async fn update_password_hash(
        &self,
        id: CustomerId,
        password_hash: &str,
    ) -> Result<(), RepositoryError>;

    async fn update_role(&self, id: CustomerId, role: Role) -> Result<Customer, RepositoryError>;

    /// Number of customers holding `Role::Admin`.
    async fn count_admins(&self) -> Result<i64, RepositoryError>;
}

/// Categories and products.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError>;

    async fn category_by_id(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError>;

    /// Returns `RepositoryError::Conflict` if the name is taken.
    async fn insert_category(&self, name: &str) -> Result<Category, RepositoryError>;

    /// All products with category names, ordered by id.
    async fn list_products(&self) -> Result<Vec<ProductDetails>, RepositoryError>;

    async fn product_by_id(&self, id: ProductId)
    -> Result<Option<ProductDetails>, RepositoryError>;

    /// The caller must have checked that the draft's category exists.
    async fn insert_product(&self, draft: &ProductDraft) -> Result<ProductDetails, RepositoryError>;

    /// Returns `None` if the product does not exist.
    async fn update_product(
        &self,
        id: ProductId,
        draft: &ProductDraft,
    ) -> Result<Option<ProductDetails>, RepositoryError>;

    /// Delete a product and every cart line referencing it.
    ///
    /// Returns `false` if the product did not exist.
    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError>;
}

/// Carts and their lines.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn cart_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<Cart>, RepositoryError>;

    /// Return the customer's cart, creating it if needed.
    ///
    /// Concurrent calls for the same customer yield the same cart.
    async fn get_or_create_cart(&self, customer_id: CustomerId) -> Result<Cart, RepositoryError>;

    /// Lines of a cart joined with product title and price, ordered by line id.
    async fn cart_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError>;

    async fn insert_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartItem, RepositoryError>;

    /// Returns `RepositoryError::NotFound` if the line does not exist.
    async fn set_item_quantity(
        &self,
        item_id: CartItemId,
        quantity: Quantity,
    ) -> Result<(), RepositoryError>;

    /// Returns `RepositoryError::NotFound` if the line does not exist.
    async fn delete_item(&self, item_id: CartItemId) -> Result<(), RepositoryError>;

    /// Delete every line of a cart, keeping the cart itself. Returns the number removed.
    async fn clear_cart(&self, cart_id: CartId) -> Result<u64, RepositoryError>;
}

/// Everything the API needs from persistence.
#[async_trait]
pub trait Store: CustomerStore + CatalogStore + CartStore {
    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Whether any administrator account exists.
///
/// This is the single rule deciding whether a self-registered admin is a
/// bootstrap (allowed) or an escalation (refused).
///
/// # Errors
///
/// Returns `RepositoryError` if the store query fails.
pub async fn admin_exists(store: &dyn Store) -> Result<bool, RepositoryError> {
    Ok(admin_count(store).await? > 0)
}

/// Number of administrator accounts. Demotions must leave at least one.
///
/// # Errors
///
/// Returns `RepositoryError` if the store query fails.
pub async fn admin_count(store: &dyn Store) -> Result<i64, RepositoryError> {
    store.count_admins().await
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
