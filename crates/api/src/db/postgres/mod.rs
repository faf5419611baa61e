//! `PostgreSQL` implementation of the store traits.
//!
//! Queries are runtime-checked (`sqlx::query_as` with `FromRow` row types) and
//! converted into domain models through `TryFrom`, so invalid stored data
//! surfaces as `RepositoryError::DataCorruption` instead of a panic.

mod carts;
mod catalog;
mod customers;

use async_trait::async_trait;
use sqlx::PgPool;

use super::{RepositoryError, Store};

/// [`Store`] backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Map a unique violation to `Conflict`, naming what collided.
fn conflict_or_database(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        let what = match db_err.constraint() {
            Some("customer_username_lower_key") => "username already exists",
            Some("customer_email_key") => "email already exists",
            Some("category_name_key") => "category already exists",
            _ => "duplicate value",
        };
        return RepositoryError::Conflict(what.to_owned());
    }
    RepositoryError::Database(e)
}
