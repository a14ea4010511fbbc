//! Category API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::ApiResult;
use crate::errors::AppError;
use crate::identity::AuthUser;
use crate::models::{Category, CreateCategoryRequest};
use crate::AppState;

/// GET /api/categories - List all categories with their topic counters.
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    Ok(Json(state.repo.list_categories().await?))
}

/// GET /api/categories/:id - Get a single category.
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Category> {
    match state.repo.get_category(&id).await? {
        Some(category) => Ok(Json(category)),
        None => Err(AppError::NotFound(format!("Category {} not found", id))),
    }
}

/// POST /api/categories - Create a new category.
pub async fn create_category(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(request): Json<CreateCategoryRequest>,
) -> ApiResult<Category> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }

    Ok(Json(state.repo.create_category(&request).await?))
}

/// DELETE /api/categories/:id - Delete a category and everything under it.
pub async fn delete_category(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repo.delete_category(&id).await?;
    Ok(Json(()))
}
