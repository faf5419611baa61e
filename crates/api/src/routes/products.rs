//! Product route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bookshop_core::{CategoryId, Price, ProductId};

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::ProductDetails;
use crate::services::catalog::{CatalogService, ProductInput};
use crate::state::AppState;

/// Product fields sent by admins on create and update.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub category_id: CategoryId,
}

impl From<ProductRequest> for ProductInput {
    fn from(body: ProductRequest) -> Self {
        Self {
            title: body.title,
            author: body.author,
            description: body.description,
            price: body.price,
            stock: body.stock,
            category_id: body.category_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: ProductId,
    pub title: String,
    pub author: String,
    pub description: String,
    pub price: Price,
    pub stock: i32,
    pub category_name: String,
}

impl From<ProductDetails> for ProductDto {
    fn from(details: ProductDetails) -> Self {
        let p = details.product;
        Self {
            id: p.id,
            title: p.title,
            author: p.author,
            description: p.description,
            price: p.price,
            stock: p.stock,
            category_name: details.category_name,
        }
    }
}

/// Response to a successful update: a message plus the new field values.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdated {
    pub message: &'static str,
    pub product_id: ProductId,
    pub title: String,
    pub author: String,
    pub description: String,
    pub price: Price,
    pub stock: i32,
    pub category_name: String,
}

/// List all products.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<ProductDto>>> {
    let products = CatalogService::new(state.store()).list_products().await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

/// Show one product.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductDto>> {
    let product = CatalogService::new(state.store()).get_product(id).await?;
    Ok(Json(product.into()))
}

/// Create a product (admin only).
#[instrument(skip(state, _admin, body))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(body): Json<ProductRequest>,
) -> Result<(StatusCode, Json<ProductDto>)> {
    let product = CatalogService::new(state.store())
        .create_product(body.into())
        .await?;

    Ok((StatusCode::CREATED, Json(product.into())))
}

/// Replace a product (admin only).
#[instrument(skip(state, _admin, body))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(body): Json<ProductRequest>,
) -> Result<Json<ProductUpdated>> {
    let updated = CatalogService::new(state.store())
        .update_product(id, body.into())
        .await?;
    let p = updated.product;

    Ok(Json(ProductUpdated {
        message: "Product updated successfully",
        product_id: p.id,
        title: p.title,
        author: p.author,
        description: p.description,
        price: p.price,
        stock: p.stock,
        category_name: updated.category_name,
    }))
}

/// Delete a product (admin only).
#[instrument(skip(state, _admin))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<&'static str> {
    CatalogService::new(state.store()).delete_product(id).await?;
    Ok("Product deleted successfully")
}
