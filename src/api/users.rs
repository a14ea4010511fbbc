//! User registration and profile API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::ApiResult;
use crate::errors::AppError;
use crate::identity::AuthUser;
use crate::models::{RegisterUserRequest, UpdateProfileRequest, User, UserProfile};
use crate::AppState;

/// POST /api/users - Register a new user.
pub async fn register_user(
    State(state): State<AppState>,
    Json(request): Json<RegisterUserRequest>,
) -> ApiResult<User> {
    if request.username.trim().is_empty() {
        return Err(AppError::Validation("Username is required".to_string()));
    }

    Ok(Json(state.repo.create_user(&request).await?))
}

/// GET /api/users/:id - Get a user profile with derived activity stats.
pub async fn get_user_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<UserProfile> {
    match state.repo.get_profile(&id).await? {
        Some(profile) => Ok(Json(profile)),
        None => Err(AppError::NotFound(format!("User {} not found", id))),
    }
}

/// PUT /api/users/:id - Update a profile. Users may only edit their own.
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateProfileRequest>,
) -> ApiResult<User> {
    if user_id != id {
        return Err(AppError::Unauthorized(
            "You can only edit your own profile".to_string(),
        ));
    }

    Ok(Json(state.repo.update_profile(&id, &request).await?))
}

/// DELETE /api/users/:id - Delete an account. Users may only delete their own.
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    if user_id != id {
        return Err(AppError::Unauthorized(
            "You can only delete your own account".to_string(),
        ));
    }

    state.repo.delete_user(&id).await?;
    Ok(Json(()))
}
