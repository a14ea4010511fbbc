//! Private messaging models.

use serde::{Deserialize, Serialize};

/// A private message between two users.
///
/// Sender and receiver become null if the corresponding account is removed;
/// the message row itself is only removed once both participants have
/// deleted it permanently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<String>,
    pub subject: String,
    pub body: String,
    pub created_at: String,
}

/// A message as listed in the inbox, outbox or bucket, annotated with the
/// viewing user's read status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageView {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<String>,
    pub subject: String,
    pub body: String,
    pub created_at: String,
    pub is_read: bool,
}

/// Request body for sending a message.
#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    pub receiver_id: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub body: String,
}
