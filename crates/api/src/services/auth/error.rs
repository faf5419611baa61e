//! Identity and account error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication and account operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] bookshop_core::EmailError),

    /// Username missing or blank.
    #[error("username is required")]
    InvalidUsername,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Reset requested with the password already in use.
    #[error("new password must differ from the current password")]
    PasswordUnchanged,

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Bearer token missing, malformed, expired, or signed for someone else.
    #[error("invalid or expired token")]
    InvalidToken,

    /// The caller may not act on this account.
    #[error("{0}")]
    Forbidden(&'static str),

    /// Self-registration as admin once an admin exists.
    #[error("Admin already exists. Only an admin can grant the Admin role.")]
    AdminAlreadyExists,

    /// Demoting the only remaining admin.
    #[error("cannot remove the Admin role from the last admin")]
    LastAdmin,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// Username or email already in use.
    #[error("{0}")]
    Conflict(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Token signing error.
    #[error("token signing error: {0}")]
    TokenSigning(String),
}

impl AuthError {
    /// Lift a repository error, keeping conflicts as conflicts.
    pub(crate) fn from_write(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Conflict(what) => Self::Conflict(what),
            RepositoryError::NotFound => Self::UserNotFound,
            other => Self::Repository(other),
        }
    }
}
