use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Last active branch per user. A UI convenience cache, not a security
/// boundary.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserSession {
    pub id: Uuid,
    pub user_id: String,
    pub active_branch_id: Option<Uuid>,
    pub last_seen: DateTime<Utc>,
    pub device_info: Option<serde_json::Value>,
}
