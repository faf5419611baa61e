//! Bearer token extractors.
//!
//! Provides extractors for requiring an authenticated caller in route handlers.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};

use crate::error::set_sentry_user;
use crate::models::CurrentCustomer;
use crate::state::AppState;

/// Extractor that requires a valid `Authorization: Bearer <token>` header.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(caller): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", caller.username)
/// }
/// ```
pub struct RequireAuth(pub CurrentCustomer);

/// Extractor that requires an authenticated caller holding the admin role.
pub struct RequireAdmin(pub CurrentCustomer);

/// Error returned when the caller is not authenticated or not allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// Missing, malformed, expired, or forged token.
    Unauthorized,
    /// Valid token without the admin role.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Bearer")],
                "Authentication required",
            )
                .into_response(),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Admin role required").into_response(),
        }
    }
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or(AuthRejection::Unauthorized)?;

        let caller = state
            .tokens()
            .verify(token)
            .map_err(|_| AuthRejection::Unauthorized)?;

        tracing::Span::current().record("customer_id", caller.id.as_i32());
        set_sentry_user(&caller.id, &caller.username);

        Ok(Self(caller))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(caller) = RequireAuth::from_request_parts(parts, state).await?;
        if !caller.role.is_admin() {
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(caller))
    }
}

/// Token part of a `Bearer` authorization value (scheme is case-insensitive).
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
