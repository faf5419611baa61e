//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::catalog::CatalogError;
use crate::services::checkout::CheckoutError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Identity or account operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Catalog operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not allowed to do this.
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

const INTERNAL: (StatusCode, &str) = (
    StatusCode::INTERNAL_SERVER_ERROR,
    "Internal server error",
);

impl AppError {
    /// Status code and client-facing message.
    fn classify(&self) -> (StatusCode, String) {
        let (status, message) = match self {
            Self::Database(_) => return owned(INTERNAL),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.as_str()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.as_str()),
            Self::Auth(err) => return classify_auth(err),
            Self::Catalog(err) => match err {
                CatalogError::ProductNotFound => (StatusCode::NOT_FOUND, "Product not found"),
                CatalogError::UnknownCategory(_)
                | CatalogError::Invalid(_)
                | CatalogError::InvalidPrice(_) => {
                    return (StatusCode::BAD_REQUEST, err.to_string());
                }
                CatalogError::Conflict(_) => return (StatusCode::CONFLICT, err.to_string()),
                CatalogError::Repository(_) => INTERNAL,
            },
            Self::Cart(err) => match err {
                CartError::Forbidden => {
                    (StatusCode::FORBIDDEN, "You can only access your own cart")
                }
                CartError::InvalidQuantity(_) => return (StatusCode::BAD_REQUEST, err.to_string()),
                CartError::CustomerNotFound => (StatusCode::NOT_FOUND, "Customer not found"),
                CartError::ProductNotFound => (StatusCode::NOT_FOUND, "Product not found"),
                CartError::CartNotFound => (StatusCode::NOT_FOUND, "Cart not found"),
                CartError::ItemNotFound => (StatusCode::NOT_FOUND, "Product not found in cart"),
                CartError::Repository(_) => INTERNAL,
            },
            Self::Checkout(err) => match err {
                CheckoutError::CustomerNotFound => (StatusCode::NOT_FOUND, "Customer not found"),
                CheckoutError::EmptyCart => (StatusCode::BAD_REQUEST, "Cart is empty"),
                CheckoutError::Notify(_) => (StatusCode::BAD_GATEWAY, "Failed to send receipt"),
                CheckoutError::Render(_) | CheckoutError::Repository(_) => INTERNAL,
            },
        };
        (status, message.to_owned())
    }
}

fn classify_auth(err: &AuthError) -> (StatusCode, String) {
    match err {
        AuthError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            "Invalid username or password".to_owned(),
        ),
        AuthError::InvalidToken => {
            (StatusCode::UNAUTHORIZED, "Invalid or expired token".to_owned())
        }
        AuthError::Forbidden(msg) => (StatusCode::FORBIDDEN, (*msg).to_owned()),
        AuthError::AdminAlreadyExists => (StatusCode::FORBIDDEN, err.to_string()),
        AuthError::UserNotFound => (StatusCode::NOT_FOUND, "User not found".to_owned()),
        AuthError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
        AuthError::InvalidEmail(_) => {
            (StatusCode::BAD_REQUEST, "Invalid email address".to_owned())
        }
        AuthError::WeakPassword(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        AuthError::InvalidUsername
        | AuthError::PasswordUnchanged
        | AuthError::LastAdmin => (StatusCode::BAD_REQUEST, err.to_string()),
        AuthError::Repository(_) | AuthError::PasswordHash | AuthError::TokenSigning(_) => {
            owned(INTERNAL)
        }
    }
}

fn owned((status, message): (StatusCode, &str)) -> (StatusCode, String) {
    (status, message.to_owned())
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.classify();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the authenticated caller.
pub fn set_sentry_user(user_id: &impl ToString, username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: Some(username.to_owned()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
mod tests {
    use bookshop_core::QuantityError;

    use super::*;
    use crate::services::email::NotifyError;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_identity_statuses() {
        assert_eq!(
            get_status(AuthError::InvalidToken.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AuthError::AdminAlreadyExists.into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AuthError::Conflict("email already exists".to_owned()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AuthError::LastAdmin.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AuthError::UserNotFound.into()),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_cart_and_checkout_statuses() {
        assert_eq!(get_status(CartError::Forbidden.into()), StatusCode::FORBIDDEN);
        assert_eq!(
            get_status(CartError::InvalidQuantity(QuantityError::NotPositive(0)).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(get_status(CartError::CartNotFound.into()), StatusCode::NOT_FOUND);
        assert_eq!(
            get_status(CheckoutError::EmptyCart.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CheckoutError::Notify(NotifyError::Rejected("down".to_owned())).into()),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_repository_errors_are_internal() {
        assert_eq!(
            get_status(AppError::Database(RepositoryError::DataCorruption("x".to_owned()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(CartError::Repository(RepositoryError::NotFound).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(CatalogError::ProductNotFound.into()),
            StatusCode::NOT_FOUND
        );
    }
}
