//! Subscription, feed and read-state API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::ApiResult;
use crate::identity::AuthUser;
use crate::models::{Post, SubscriptionStatus};
use crate::AppState;

/// POST /api/topics/:id/subscription - Toggle the acting user's
/// subscription to a topic. Unsubscribing clears the user's read-state for
/// posts under the topic.
pub async fn toggle_subscription(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(topic_id): Path<String>,
) -> ApiResult<SubscriptionStatus> {
    let subscribed = state.repo.toggle_subscription(&user_id, &topic_id).await?;

    let message = if subscribed {
        "Subscription created"
    } else {
        "Subscription removed"
    };

    Ok(Json(SubscriptionStatus {
        subscribed,
        message: message.to_string(),
    }))
}

/// GET /api/feed - Unread posts across all of the acting user's
/// subscriptions, newest first.
pub async fn get_feed(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Vec<Post>> {
    Ok(Json(state.repo.compute_feed(&user_id).await?))
}

/// POST /api/posts/:id/read - Mark a post as read by the acting user.
pub async fn mark_post_read(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(post_id): Path<String>,
) -> ApiResult<()> {
    state.repo.mark_post_read(&user_id, &post_id).await?;
    Ok(Json(()))
}

/// DELETE /api/posts/:id/read - Remove the acting user's read mark.
pub async fn mark_post_unread(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(post_id): Path<String>,
) -> ApiResult<()> {
    state.repo.mark_post_unread(&user_id, &post_id).await?;
    Ok(Json(()))
}
