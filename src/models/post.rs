//! Post model.

use serde::{Deserialize, Serialize};

/// A single post under a topic.
///
/// `author_id` is null when the author's account has been removed; the post
/// itself survives until its topic is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub topic_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    pub body: String,
    pub creation_date: String,
}

/// A post as rendered in a topic listing: the post plus its vote total and
/// the viewing user's own vote (0 when the viewer has not voted, or is
/// anonymous).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostWithVotes {
    pub id: String,
    pub topic_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    pub body: String,
    pub creation_date: String,
    pub votes: i64,
    pub viewer_vote: i64,
}

/// Request body for adding a post to a topic.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostRequest {
    pub body: String,
}
