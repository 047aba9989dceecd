use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Branch entity - an age-based section within a group.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Branch {
    pub id: Uuid,
    pub name: String,
    pub group_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Branch {
    pub fn new(name: String, group_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            group_id,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

/// Branch with the number of active members, for admin listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BranchSummary {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub member_count: i64,
}

/// Branch joined with its group, for the public branch view.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BranchWithGroup {
    pub id: Uuid,
    pub name: String,
    pub group_id: Uuid,
    pub group_name: String,
    pub group_slug: String,
    pub is_active: bool,
}
