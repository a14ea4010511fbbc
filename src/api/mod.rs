//! REST API module.
//!
//! Contains all API routes and handlers. Handlers stay thin: validate,
//! delegate to the repository, serialize.

mod categories;
mod feed;
mod messages;
mod posts;
mod topics;
mod users;

pub use categories::*;
pub use feed::*;
pub use messages::*;
pub use posts::*;
pub use topics::*;
pub use users::*;

use axum::Json;

/// Response type for all API handlers.
pub type ApiResult<T> = Result<Json<T>, crate::errors::AppError>;
