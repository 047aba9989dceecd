//! Access request model - a pending membership application.
//!
//! A request transitions pending -> approved or pending -> rejected
//! exactly once; the transition is guarded in the database by a
//! conditional update inside the decision transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Access request state codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }
}

/// Access request entity.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AccessRequest {
    pub id: Uuid,
    pub email: String,
    pub group_id: Uuid,
    pub branch_id: Uuid,
    pub user_id: Option<String>,
    pub status: String,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccessRequest {
    pub fn new(
        email: String,
        group_id: Uuid,
        branch_id: Uuid,
        user_id: Option<String>,
        message: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            group_id,
            branch_id,
            user_id,
            status: RequestStatus::Pending.as_str().to_string(),
            message,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending.as_str()
    }
}

/// Request joined with group and branch names, for listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AccessRequestDetails {
    pub id: Uuid,
    pub email: String,
    pub status: String,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub group_name: String,
    pub branch_name: String,
}
