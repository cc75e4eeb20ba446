//! Category routes.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::db::CategoryRepository;
use crate::error::{ApiError, Result};
use crate::middleware::RequireAdmin;
use crate::models::catalog::Category;
use crate::state::AppState;

/// Category creation request body.
#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub title: Option<String>,
}

/// GET /api/categories - list all categories.
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = CategoryRepository::new(state.pool()).list().await?;
    Ok(Json(categories))
}

/// POST /api/categories - create a category (admin only).
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<Response> {
    let title = request
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("title is required".to_owned()))?;

    let category = CategoryRepository::new(state.pool())
        .create(title.trim())
        .await?;

    Ok((StatusCode::CREATED, Json(category)).into_response())
}
