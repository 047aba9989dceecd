//! Validation model - the recorded decision on an access request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approved => "approved",
            Decision::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Validation {
    pub id: Uuid,
    pub request_id: Uuid,
    pub validator_user_id: String,
    pub decision: String,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Validation {
    pub fn new(
        request_id: Uuid,
        validator_user_id: String,
        decision: Decision,
        comment: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id,
            validator_user_id,
            decision: decision.as_str().to_string(),
            comment,
            created_at: Utc::now(),
        }
    }
}
