//! Membership model - a user's role on a branch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Roles a user can hold on a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
            Role::Viewer => "viewer",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            "viewer" => Ok(Role::Viewer),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// Membership entity. `user_id` is the opaque subject from the external
/// identity provider.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserBranchRole {
    pub id: Uuid,
    pub user_id: String,
    pub branch_id: Uuid,
    pub role: String,
    pub is_active: bool,
    pub granted_by: Option<String>,
    pub granted_at: DateTime<Utc>,
    pub last_access_at: Option<DateTime<Utc>>,
}

impl UserBranchRole {
    pub fn new(user_id: String, branch_id: Uuid, role: Role, granted_by: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            branch_id,
            role: role.as_str().to_string(),
            is_active: true,
            granted_by,
            granted_at: Utc::now(),
            last_access_at: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin.as_str()
    }
}
