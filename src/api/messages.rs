//! Private messaging API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::ApiResult;
use crate::errors::AppError;
use crate::identity::AuthUser;
use crate::models::{Message, MessageView, SendMessageRequest};
use crate::AppState;

/// POST /api/messages - Send a private message.
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<SendMessageRequest>,
) -> ApiResult<Message> {
    if request.receiver_id.trim().is_empty() {
        return Err(AppError::Validation("Receiver is required".to_string()));
    }

    Ok(Json(state.repo.send_message(&user_id, &request).await?))
}

/// GET /api/messages/inbox - Received messages with read status.
pub async fn inbox(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Vec<MessageView>> {
    Ok(Json(state.repo.inbox(&user_id).await?))
}

/// GET /api/messages/outbox - Sent messages with read status.
pub async fn outbox(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Vec<MessageView>> {
    Ok(Json(state.repo.outbox(&user_id).await?))
}

/// GET /api/messages/bucket - Messages deleted once, not permanently.
pub async fn bucket(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Vec<MessageView>> {
    Ok(Json(state.repo.bucket(&user_id).await?))
}

/// GET /api/messages/:id - Read a single message. Only the sender or
/// receiver may see it.
pub async fn get_message(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<MessageView> {
    let message = state
        .repo
        .get_message(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Message {} not found", id)))?;

    let is_sender = message.sender_id.as_deref() == Some(user_id.as_str());
    let is_receiver = message.receiver_id.as_deref() == Some(user_id.as_str());
    if !is_sender && !is_receiver {
        return Err(AppError::NotFound("The page does not exist".to_string()));
    }

    let is_read = state.repo.is_message_read(&user_id, &id).await?;

    Ok(Json(MessageView {
        id: message.id,
        sender_id: message.sender_id,
        receiver_id: message.receiver_id,
        subject: message.subject,
        body: message.body,
        created_at: message.created_at,
        is_read,
    }))
}

/// DELETE /api/messages/:id - Delete a message for the acting user
/// (two-stage: bucket first, then permanent).
pub async fn delete_message(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repo.delete_message(&user_id, &id).await?;
    Ok(Json(()))
}

/// POST /api/messages/:id/restore - Restore a message from the bucket.
pub async fn restore_message(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repo.restore_message(&user_id, &id).await?;
    Ok(Json(()))
}

/// POST /api/messages/:id/read - Mark a message as read.
pub async fn mark_message_read(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repo.mark_message_read(&user_id, &id).await?;
    Ok(Json(()))
}

/// DELETE /api/messages/:id/read - Remove a message read mark.
pub async fn mark_message_unread(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repo.mark_message_unread(&user_id, &id).await?;
    Ok(Json(()))
}
