//! Group model - the top-level tenant (a scouting local unit).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Group entity. The `slug` doubles as the invite code members type in
/// when requesting access (stored lowercase, displayed uppercase).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub admin_user_id: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    pub fn new(name: String, slug: String, admin_user_id: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            slug: slug.to_lowercase(),
            admin_user_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Invite code shown to users (uppercase form of the slug).
    pub fn invite_code(&self) -> String {
        self.slug.to_uppercase()
    }
}
