//! Topic model.

use serde::{Deserialize, Serialize};

/// A discussion topic inside a category.
///
/// `posts_amount` is a denormalized counter kept in step with post creation
/// and deletion. `last_active_user` is the author of the most recently
/// created post, or the topic's creator while no posts exist; it becomes
/// null if that user account is removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub category_id: String,
    pub title: String,
    pub creation_date: String,
    pub last_updated_date: String,
    pub posts_amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_active_user: Option<String>,
}

/// Request body for creating a new topic.
///
/// A topic is always created together with its opening post, so the body of
/// that first post travels in the same request.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTopicRequest {
    pub category_id: String,
    pub title: String,
    pub body: String,
}
