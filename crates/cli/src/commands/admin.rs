//! Admin account management commands.
//!
//! # Usage
//!
//! ```bash
//! bookshop-cli admin create -u boss -e boss@example.com -p 'long-password'
//! ```
//!
//! Unlike `POST /auth/register`, this works even when an admin already
//! exists. The account gets the same validation and uniqueness checks.
//!
//! # Environment Variables
//!
//! - `BOOKSHOP_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

use thiserror::Error;

use bookshop_api::db::{self, PgStore};
use bookshop_api::services::account;
use bookshop_api::services::auth::AuthError;
use bookshop_core::CustomerId;

use super::{MissingEnvVar, database_url};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    MissingEnvVar(#[from] MissingEnvVar),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Validation or uniqueness failure.
    #[error("Could not create admin: {0}")]
    Account(#[from] AuthError),
}

/// Create a new admin account.
///
/// # Returns
///
/// The ID of the created customer.
///
/// # Errors
///
/// Returns `AdminError` if the database is unreachable or the account is
/// rejected.
pub async fn create(username: &str, email: &str, password: &str) -> Result<CustomerId, AdminError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to database...");
    let store = PgStore::new(db::create_pool(&database_url).await?);

    tracing::info!("Creating admin account: {} ({})", username, email);
    let customer = account::create_admin(&store, username, email, password).await?;

    tracing::info!(
        "Admin created successfully! ID: {}, Username: {}",
        customer.id,
        customer.username
    );

    Ok(customer.id)
}
