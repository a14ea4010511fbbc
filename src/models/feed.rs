//! Subscription and read-state models backing the activity feed.

use serde::{Deserialize, Serialize};

/// A user's subscription to a topic.
///
/// `creation_date` is the watermark: only posts created strictly after it
/// count as unread for this subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    pub topic_id: String,
    pub creation_date: String,
}

/// Result of toggling a subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionStatus {
    pub subscribed: bool,
    pub message: String,
}
