//! Category route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bookshop_core::CategoryId;

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::Category;
use crate::services::catalog::CatalogService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CategoryDto {
    pub id: CategoryId,
    pub name: String,
}

impl From<Category> for CategoryDto {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
        }
    }
}

/// List all categories.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<CategoryDto>>> {
    let categories = CatalogService::new(state.store()).list_categories().await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

/// Create a category (admin only).
#[instrument(skip(state, _admin, body), fields(name = %body.name))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(body): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<CategoryDto>)> {
    let category = CatalogService::new(state.store())
        .create_category(&body.name)
        .await?;

    Ok((StatusCode::CREATED, Json(category.into())))
}
