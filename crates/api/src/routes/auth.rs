//! Account and login route handlers.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bookshop_core::{CustomerId, Email, Role};

use crate::error::Result;
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::Customer;
use crate::services::account::{AccountService, AccountUpdate};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub new_username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRoleRequest {
    pub username: String,
    pub new_role: String,
}

/// Public view of a freshly registered account.
#[derive(Debug, Serialize)]
pub struct RegisteredCustomer {
    pub id: CustomerId,
    pub username: String,
    pub email: Email,
    pub role: Role,
}

impl From<Customer> for RegisteredCustomer {
    fn from(customer: Customer) -> Self {
        Self {
            id: customer.id,
            username: customer.username,
            email: customer.email,
            role: customer.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RoleAssignment {
    pub id: CustomerId,
    pub username: String,
    pub role: Role,
}

/// Handle registration.
#[instrument(skip(state, body), fields(username = %body.username))]
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<RegisteredCustomer>> {
    let customer = AccountService::new(state.store(), state.tokens())
        .register(&body.username, &body.email, &body.password, body.role.as_deref())
        .await?;

    Ok(Json(customer.into()))
}

/// Handle login. Responds with `Bearer <token>` as plain text.
#[instrument(skip(state, body), fields(username = %body.username))]
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<String> {
    let bearer = AccountService::new(state.store(), state.tokens())
        .login(&body.username, &body.password)
        .await?;

    Ok(bearer)
}

/// Handle username/email changes.
#[instrument(skip(state, caller, body))]
pub async fn update_account(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Json(body): Json<UpdateAccountRequest>,
) -> Result<&'static str> {
    AccountService::new(state.store(), state.tokens())
        .update_account(
            &caller,
            AccountUpdate {
                username: body.username,
                new_username: body.new_username,
                email: body.email,
            },
        )
        .await?;

    Ok("Account updated successfully")
}

/// Handle a password reset.
#[instrument(skip(state, caller, body))]
pub async fn reset_password(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<&'static str> {
    AccountService::new(state.store(), state.tokens())
        .reset_password(&caller, &body.email, &body.new_password)
        .await?;

    Ok("Password has been reset successfully")
}

/// Handle a role change (admin only).
#[instrument(skip(state, caller, body))]
pub async fn change_role(
    State(state): State<AppState>,
    RequireAdmin(caller): RequireAdmin,
    Json(body): Json<ChangeRoleRequest>,
) -> Result<Json<RoleAssignment>> {
    let customer = AccountService::new(state.store(), state.tokens())
        .change_role(&caller, &body.username, &body.new_role)
        .await?;

    Ok(Json(RoleAssignment {
        id: customer.id,
        username: customer.username,
        role: customer.role,
    }))
}
