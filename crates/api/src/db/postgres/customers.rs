//! Customer queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bookshop_core::{CustomerId, Email, Role};

use super::{PgStore, conflict_or_database};
use crate::db::{CustomerStore, RepositoryError};
use crate::models::{Customer, NewCustomer};

const CUSTOMER_COLUMNS: &str = "id, username, email, password_hash, role, created_at";

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: i32,
    username: String,
    email: String,
    password_hash: String,
    role: Role,
    created_at: DateTime<Utc>,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = RepositoryError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: CustomerId::new(row.id),
            username: row.username,
            email,
            password_hash: row.password_hash,
            role: row.role,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl CustomerStore for PgStore {
    async fn list_customers(&self) -> Result<Vec<Customer>, RepositoryError> {
        let rows = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM bookshop.customer ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn customer_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM bookshop.customer WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn customer_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM bookshop.customer WHERE LOWER(username) = LOWER($1)"
        ))
        .bind(username.trim())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn customer_by_email(&self, email: &Email) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM bookshop.customer WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn insert_customer(&self, customer: NewCustomer) -> Result<Customer, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            r"
            INSERT INTO bookshop.customer (username, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {CUSTOMER_COLUMNS}
            "
        ))
        .bind(&customer.username)
        .bind(customer.email.as_str())
        .bind(&customer.password_hash)
        .bind(customer.role)
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_or_database)?;

        row.try_into()
    }

    async fn update_profile(
        &self,
        id: CustomerId,
        username: &str,
        email: &Email,
    ) -> Result<Customer, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            r"
            UPDATE bookshop.customer
            SET username = $2, email = $3
            WHERE id = $1
            RETURNING {CUSTOMER_COLUMNS}
            "
        ))
        .bind(id.as_i32())
        .bind(username)
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conflict_or_database)?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn update_password_hash(
        &self,
        id: CustomerId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE bookshop.customer SET password_hash = $2 WHERE id = $1")
            .bind(id.as_i32())
            .bind(password_hash)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn update_role(&self, id: CustomerId, role: Role) -> Result<Customer, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "UPDATE bookshop.customer SET role = $2 WHERE id = $1 RETURNING {CUSTOMER_COLUMNS}"
        ))
        .bind(id.as_i32())
        .bind(role)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn count_admins(&self) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM bookshop.customer WHERE role = 'admin'")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
