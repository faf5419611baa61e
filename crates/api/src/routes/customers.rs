//! Customer lookup route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use bookshop_core::{CustomerId, Email, Role};

use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::Customer;
use crate::state::AppState;

/// Customer as returned to clients. Never carries the password hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDto {
    pub id: CustomerId,
    pub username: String,
    pub email: Email,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<Customer> for CustomerDto {
    fn from(customer: Customer) -> Self {
        Self {
            id: customer.id,
            username: customer.username,
            email: customer.email,
            role: customer.role,
            created_at: customer.created_at,
        }
    }
}

/// List every customer (admin only).
#[instrument(skip(state, _admin))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<CustomerDto>>> {
    let customers = state.store().list_customers().await?;
    Ok(Json(customers.into_iter().map(Into::into).collect()))
}

/// Show one customer (self or admin).
#[instrument(skip(state, caller))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(id): Path<CustomerId>,
) -> Result<Json<CustomerDto>> {
    if !caller.can_act_for(id) {
        return Err(AppError::Forbidden(
            "You can only view your own account".to_owned(),
        ));
    }

    let customer = state
        .store()
        .customer_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer not found".to_owned()))?;

    Ok(Json(customer.into()))
}
