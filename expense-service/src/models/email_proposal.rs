//! Unit email proposal model - a branch-scoped suggestion of a delegated
//! email address, requiring admin validation. At most one proposal per
//! branch may be in 'proposed' state at a time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Proposed,
    Validated,
    Refused,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Proposed => "proposed",
            ProposalStatus::Validated => "validated",
            ProposalStatus::Refused => "refused",
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UnitEmailProposal {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub email: String,
    pub status: String,
    pub proposed_by: String,
    pub validated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UnitEmailProposal {
    pub fn new(branch_id: Uuid, email: String, proposed_by: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            branch_id,
            email,
            status: ProposalStatus::Proposed.as_str().to_string(),
            proposed_by,
            validated_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_proposed(&self) -> bool {
        self.status == ProposalStatus::Proposed.as_str()
    }
}

/// Proposal joined with branch and group names, for admin listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProposalDetails {
    pub id: Uuid,
    pub email: String,
    pub status: String,
    pub proposed_by: String,
    pub validated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub branch_name: String,
    pub group_name: String,
}
