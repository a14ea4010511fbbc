//! Error handling module for the forum backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and response bodies.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Client-facing error codes carried in the response body.
///
/// Vote and read-state rejections report "400" in the body while the HTTP
/// status is 404, matching the contract the frontend already consumes.
pub mod codes {
    pub const BAD_REQUEST: &str = "400";
    pub const UNAUTHORIZED: &str = "401";
    pub const NOT_FOUND: &str = "404";
    pub const CONFLICT: &str = "409";
    pub const INTERNAL_ERROR: &str = "500";
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Actor attempted to vote on their own post
    SelfVote,
    /// Same-direction re-vote on a post
    DuplicateVote,
    /// Post or message already marked read by this user
    AlreadyRead(String),
    /// Resource not found
    NotFound(String),
    /// Validation error
    Validation(String),
    /// Acting user missing or unknown
    Unauthorized(String),
    /// Atomic update affected no rows
    Concurrency(String),
    /// Database error
    Database(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::SelfVote => StatusCode::NOT_FOUND,
            AppError::DuplicateVote => StatusCode::NOT_FOUND,
            AppError::AlreadyRead(_) => StatusCode::NOT_FOUND,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Concurrency(_) => StatusCode::CONFLICT,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the client-facing code for this error.
    pub fn client_code(&self) -> &'static str {
        match self {
            AppError::SelfVote => codes::BAD_REQUEST,
            AppError::DuplicateVote => codes::BAD_REQUEST,
            AppError::AlreadyRead(_) => codes::BAD_REQUEST,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::Validation(_) => codes::BAD_REQUEST,
            AppError::Unauthorized(_) => codes::UNAUTHORIZED,
            AppError::Concurrency(_) => codes::CONFLICT,
            AppError::Database(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::SelfVote => "You cannot vote for your own posts".to_string(),
            AppError::DuplicateVote => "Bad request.".to_string(),
            AppError::AlreadyRead(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Validation(msg) => msg.clone(),
            AppError::Unauthorized(msg) => msg.clone(),
            AppError::Concurrency(msg) => msg.clone(),
            AppError::Database(msg) => msg.clone(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.client_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AppError::Database(format!("Database error: {}", err))
    }
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        Self {
            error: error.message(),
            code: error.client_code().to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse::new(&self);
        (status, Json(body)).into_response()
    }
}
