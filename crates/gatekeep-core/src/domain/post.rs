use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Post entity - the resource behind ownership-gated actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn new(id: i64, user_id: i64, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id,
            user_id,
            title: title.into(),
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}
