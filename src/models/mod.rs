use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row of the `email_groups` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Row of the `group_members` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub group_id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
}
