//! Customer account models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bookshop_core::{CustomerId, Email, Role};

/// A registered customer account.
///
/// `password_hash` is an argon2 PHC string and never leaves the service layer.
#[derive(Debug, Clone)]
pub struct Customer {
    pub id: CustomerId,
    pub username: String,
    pub email: Email,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Case-insensitive username comparison, matching the unique index.
    #[must_use]
    pub fn has_username(&self, username: &str) -> bool {
        self.username.to_lowercase() == username.trim().to_lowercase()
    }
}

/// Fields for inserting a customer.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub username: String,
    pub email: Email,
    pub password_hash: String,
    pub role: Role,
}

/// The caller resolved from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentCustomer {
    pub id: CustomerId,
    pub username: String,
    pub role: Role,
}

impl CurrentCustomer {
    /// Whether the caller may act on resources owned by `owner`.
    ///
    /// Admins may act for anyone; users only for themselves.
    #[must_use]
    pub fn can_act_for(&self, owner: CustomerId) -> bool {
        match self.role {
            Role::Admin => true,
            Role::User => self.id == owner,
        }
    }
}

impl From<&Customer> for CurrentCustomer {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id,
            username: customer.username.clone(),
            role: customer.role,
        }
    }
}
