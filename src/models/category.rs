//! Category model.

use serde::{Deserialize, Serialize};

/// A forum category grouping related topics.
///
/// `topics_amount` is a denormalized counter maintained transactionally with
/// topic creation and deletion; it always equals the live count of topics in
/// the category. `last_updated_date` tracks the newest post anywhere under
/// the category, or the category's own creation time before any posts exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub topics_amount: i64,
    pub last_updated_date: String,
}

/// Request body for creating a new category.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
}
