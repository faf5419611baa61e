//! Order route handlers.

use axum::extract::State;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::checkout::CheckoutService;
use crate::state::AppState;

/// Check out the caller's cart and email the receipt.
#[instrument(skip(state, caller), fields(customer_id = %caller.id))]
pub async fn checkout(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
) -> Result<&'static str> {
    CheckoutService::new(state.store(), state.notifier(), state.currency())
        .checkout(&caller)
        .await?;

    Ok("Order confirmed and receipt sent.")
}
