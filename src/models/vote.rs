//! Vote ledger model.

use serde::{Deserialize, Serialize};

/// Direction of a vote on a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    /// The signed value stored in the vote ledger.
    pub fn value(self) -> i64 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "up" => Some(VoteDirection::Up),
            "down" => Some(VoteDirection::Down),
            _ => None,
        }
    }
}

/// Result of casting a vote.
///
/// `votes` is the post's total recomputed from the ledger after the
/// mutation; `prev_vote` is the value the acting user's vote row held before
/// the call (0 when there was none).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteStatus {
    pub votes: i64,
    pub prev_vote: i64,
}
