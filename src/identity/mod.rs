//! Acting-user identity extraction.
//!
//! Authentication happens upstream; the HTTP layer hands the core a
//! validated user id in the `x-user-id` header. The extractors here resolve
//! that id against the users table so handlers always act on a real account.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::errors::AppError;
use crate::AppState;

/// Header name carrying the acting user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The acting, verified user.
///
/// Rejects with 401 when the header is missing or names an unknown user.
pub struct AuthUser(pub String);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::Unauthorized("Missing x-user-id header".to_string()))?;

        match state.repo.get_user(&user_id).await? {
            Some(user) => Ok(AuthUser(user.id)),
            None => Err(AppError::Unauthorized(format!("Unknown user {}", user_id))),
        }
    }
}

/// Like [`AuthUser`], but anonymous requests pass through as `None`.
///
/// A header naming an unknown user is still rejected.
pub struct MaybeUser(pub Option<String>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(user_id) = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
        else {
            return Ok(MaybeUser(None));
        };

        match state.repo.get_user(user_id).await? {
            Some(user) => Ok(MaybeUser(Some(user.id))),
            None => Err(AppError::Unauthorized(format!("Unknown user {}", user_id))),
        }
    }
}
