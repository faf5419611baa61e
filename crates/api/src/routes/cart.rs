//! Cart route handlers.
//!
//! Every mutation names the customer whose cart it targets; users may only
//! name themselves, admins anyone.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bookshop_core::{CartId, CustomerId, Price, ProductId, Quantity};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{CartLine, CartView};
use crate::services::cart::{CartLineUpdate, CartService};
use crate::state::AppState;

/// Body of add, update and remove.
///
/// `quantity` stays a raw integer so out-of-range values reach the service
/// and are reported as 400.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    pub customer_id: CustomerId,
    pub product_id: ProductId,
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemDto {
    pub product_id: ProductId,
    pub product_title: String,
    pub price: Price,
    pub quantity: Quantity,
    pub line_total: Price,
}

impl From<CartLine> for CartItemDto {
    fn from(line: CartLine) -> Self {
        Self {
            line_total: line.line_total(),
            product_id: line.product_id,
            product_title: line.title,
            price: line.price,
            quantity: line.quantity,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartDto {
    pub cart_id: CartId,
    pub customer_id: CustomerId,
    pub items: Vec<CartItemDto>,
    pub total: Price,
}

impl From<CartView> for CartDto {
    fn from(view: CartView) -> Self {
        Self {
            total: view.total(),
            cart_id: view.cart_id,
            customer_id: view.customer_id,
            items: view.lines.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineUpdateDto {
    pub customer_id: CustomerId,
    pub item: CartItemDto,
}

impl From<CartLineUpdate> for CartLineUpdateDto {
    fn from(update: CartLineUpdate) -> Self {
        Self {
            customer_id: update.customer_id,
            item: update.line.into(),
        }
    }
}

fn service(state: &AppState) -> CartService<'_> {
    CartService::new(state.store(), state.cart_line_policy())
}

/// Show a customer's cart.
#[instrument(skip(state, caller))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(customer_id): Path<CustomerId>,
) -> Result<Json<CartDto>> {
    let view = service(&state).get_cart(&caller, customer_id).await?;
    Ok(Json(view.into()))
}

/// Add a product to a cart.
#[instrument(skip(state, caller))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Json(body): Json<CartItemRequest>,
) -> Result<Json<CartDto>> {
    let view = service(&state)
        .add_item(&caller, body.customer_id, body.product_id, body.quantity)
        .await?;
    Ok(Json(view.into()))
}

/// Set the quantity of a cart line.
#[instrument(skip(state, caller))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Json(body): Json<CartItemRequest>,
) -> Result<Json<CartLineUpdateDto>> {
    let update = service(&state)
        .update_item(&caller, body.customer_id, body.product_id, body.quantity)
        .await?;
    Ok(Json(update.into()))
}

/// Take units of a product out of a cart.
#[instrument(skip(state, caller))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Json(body): Json<CartItemRequest>,
) -> Result<Json<CartDto>> {
    let view = service(&state)
        .remove_item(&caller, body.customer_id, body.product_id, body.quantity)
        .await?;
    Ok(Json(view.into()))
}
