//! Post API endpoints, including vote casting.

use axum::{
    extract::{Path, State},
    Json,
};

use super::ApiResult;
use crate::errors::AppError;
use crate::identity::{AuthUser, MaybeUser};
use crate::models::{CreatePostRequest, Post, PostWithVotes, VoteDirection, VoteStatus};
use crate::AppState;

/// GET /api/topics/:id/posts - List posts under a topic, newest first,
/// annotated with vote totals and the viewer's own vote when identified.
pub async fn list_topic_posts(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(topic_id): Path<String>,
) -> ApiResult<Vec<PostWithVotes>> {
    state
        .repo
        .get_topic(&topic_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Topic {} not found", topic_id)))?;

    Ok(Json(
        state.repo.list_posts(&topic_id, viewer.as_deref()).await?,
    ))
}

/// POST /api/topics/:id/posts - Add a post to a topic.
pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(topic_id): Path<String>,
    Json(request): Json<CreatePostRequest>,
) -> ApiResult<Post> {
    if request.body.trim().is_empty() {
        return Err(AppError::Validation("Post body is required".to_string()));
    }

    Ok(Json(
        state.repo.create_post(&topic_id, &user_id, &request.body).await?,
    ))
}

/// DELETE /api/posts/:id - Delete a post. Only the author may delete.
pub async fn delete_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let post = state
        .repo
        .get_post(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Post {} not found", id)))?;

    if post.author_id.as_deref() != Some(user_id.as_str()) {
        return Err(AppError::NotFound("The page does not exist".to_string()));
    }

    state.repo.delete_post(&id).await?;
    Ok(Json(()))
}

/// POST /api/posts/:id/vote/:direction - Cast a vote on a post.
pub async fn vote_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((post_id, direction)): Path<(String, String)>,
) -> ApiResult<VoteStatus> {
    let direction = VoteDirection::from_str(&direction)
        .ok_or_else(|| AppError::NotFound("Page not found".to_string()))?;

    Ok(Json(
        state.repo.cast_vote(&user_id, &post_id, direction).await?,
    ))
}
