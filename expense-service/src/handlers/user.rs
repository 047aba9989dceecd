//! Per-user handlers: branch listing and the active branch selection
//! remembered across devices.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::AppState;
use service_core::error::AppError;

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct UserBranchResponse {
    pub id: Uuid,
    pub name: String,
    pub group_id: Uuid,
    pub is_active: bool,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct UserBranchesResponse {
    pub branches: Vec<UserBranchResponse>,
    pub active_branch_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SetActiveBranchRequest {
    pub branch_id: Uuid,
    pub device_info: Option<serde_json::Value>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Branches the caller belongs to, with their role on each, plus the
/// branch currently selected in their session.
///
/// GET /user/branches
#[tracing::instrument(skip_all)]
pub async fn list_branches(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<UserBranchesResponse>, AppError> {
    let branches = state
        .db
        .list_user_branches(&auth.0.user_id)
        .await?
        .into_iter()
        .map(|b| UserBranchResponse {
            id: b.id,
            name: b.name,
            group_id: b.group_id,
            is_active: b.is_active,
            role: b.role,
        })
        .collect();

    let active_branch_id = state
        .db
        .find_session(&auth.0.user_id)
        .await?
        .and_then(|s| s.active_branch_id);

    Ok(Json(UserBranchesResponse {
        branches,
        active_branch_id,
    }))
}

/// Select the caller's active branch. Requires an active membership on
/// the target branch; the selection is stored in the session record so
/// other devices pick it up.
///
/// PUT /user/active-branch
#[tracing::instrument(skip(state, auth, req), fields(user_id = %auth.0.user_id))]
pub async fn set_active_branch(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<SetActiveBranchRequest>,
) -> Result<StatusCode, AppError> {
    let membership = state
        .db
        .find_active_membership(&auth.0.user_id, req.branch_id)
        .await?;
    if membership.is_none() {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "You are not a member of this branch"
        )));
    }

    let device_info = req.device_info.unwrap_or(serde_json::Value::Null);
    state
        .db
        .upsert_active_branch(&auth.0.user_id, req.branch_id, device_info)
        .await?;

    tracing::info!(branch_id = %req.branch_id, "Active branch updated");

    Ok(StatusCode::NO_CONTENT)
}
