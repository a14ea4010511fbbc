//! Topic API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::ApiResult;
use crate::errors::AppError;
use crate::identity::AuthUser;
use crate::models::{CreateTopicRequest, Topic};
use crate::AppState;

/// GET /api/categories/:id/topics - List topics in a category, most
/// recently active first.
pub async fn list_category_topics(
    State(state): State<AppState>,
    Path(category_id): Path<String>,
) -> ApiResult<Vec<Topic>> {
    state
        .repo
        .get_category(&category_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Category {} not found", category_id)))?;

    Ok(Json(state.repo.list_topics(&category_id).await?))
}

/// GET /api/topics/:id - Get a single topic.
pub async fn get_topic(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Topic> {
    match state.repo.get_topic(&id).await? {
        Some(topic) => Ok(Json(topic)),
        None => Err(AppError::NotFound(format!("Topic {} not found", id))),
    }
}

/// POST /api/topics - Create a new topic together with its opening post.
pub async fn create_topic(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<CreateTopicRequest>,
) -> ApiResult<Topic> {
    if request.title.trim().is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }
    if request.body.trim().is_empty() {
        return Err(AppError::Validation(
            "Opening post body is required".to_string(),
        ));
    }

    let topic = state
        .repo
        .create_topic(&request.category_id, &request.title, &user_id)
        .await?;
    state
        .repo
        .create_post(&topic.id, &user_id, &request.body)
        .await?;

    // Re-read so the returned counters reflect the opening post.
    match state.repo.get_topic(&topic.id).await? {
        Some(topic) => Ok(Json(topic)),
        None => Err(AppError::NotFound(format!("Topic {} not found", topic.id))),
    }
}

/// DELETE /api/topics/:id - Delete a topic and its posts.
pub async fn delete_topic(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repo.delete_topic(&id).await?;
    Ok(Json(()))
}
