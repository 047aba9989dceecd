//! Branch-scoped handlers, available to any active member of the branch.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::middleware::auth::AuthUser;
use crate::models::{UnitEmailProposal, UserBranchRole};
use crate::utils::ValidatedJson;
use crate::AppState;
use service_core::error::AppError;

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct BranchResponse {
    pub id: Uuid,
    pub name: String,
    pub group_id: Uuid,
    pub group_name: String,
    pub group_code: String,
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub user_id: String,
    pub role: String,
    pub granted_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct MemberListResponse {
    pub members: Vec<MemberResponse>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProposalRequest {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ProposalListResponse {
    pub proposals: Vec<UnitEmailProposal>,
}

// ============================================================================
// Handlers
// ============================================================================

/// An active branch with its group context.
///
/// GET /branches/{id}
#[tracing::instrument(skip_all)]
pub async fn get_branch(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(branch_id): Path<Uuid>,
) -> Result<Json<BranchResponse>, AppError> {
    require_membership(&state, &auth.0.user_id, branch_id).await?;

    let branch = state
        .db
        .find_branch_with_group(branch_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Branch not found")))?;

    Ok(Json(BranchResponse {
        id: branch.id,
        name: branch.name,
        group_id: branch.group_id,
        group_name: branch.group_name,
        group_code: branch.group_slug.to_uppercase(),
        is_active: branch.is_active,
    }))
}

/// Active members of a branch.
///
/// GET /branches/{id}/members
#[tracing::instrument(skip_all)]
pub async fn list_members(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(branch_id): Path<Uuid>,
) -> Result<Json<MemberListResponse>, AppError> {
    require_membership(&state, &auth.0.user_id, branch_id).await?;

    let members = state
        .db
        .list_branch_members(branch_id)
        .await?
        .into_iter()
        .map(|m| MemberResponse {
            user_id: m.user_id,
            role: m.role,
            granted_at: m.granted_at,
        })
        .collect();

    Ok(Json(MemberListResponse { members }))
}

/// Unit email proposals of a branch.
///
/// GET /branches/{id}/proposals
#[tracing::instrument(skip_all)]
pub async fn list_proposals(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(branch_id): Path<Uuid>,
) -> Result<Json<ProposalListResponse>, AppError> {
    require_membership(&state, &auth.0.user_id, branch_id).await?;

    let proposals = state.db.list_proposals_for_branch(branch_id).await?;
    Ok(Json(ProposalListResponse { proposals }))
}

/// Propose a delegated unit email for the branch. At most one proposal
/// may be awaiting a decision per branch.
///
/// POST /branches/{id}/proposals
#[tracing::instrument(skip(state, auth, req), fields(user_id = %auth.0.user_id))]
pub async fn create_proposal(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(branch_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<CreateProposalRequest>,
) -> Result<(StatusCode, Json<UnitEmailProposal>), AppError> {
    require_membership(&state, &auth.0.user_id, branch_id).await?;

    if state
        .db
        .find_proposed_for_branch(branch_id)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "A proposal is already awaiting a decision for this branch"
        )));
    }

    let proposal = UnitEmailProposal::new(branch_id, req.email, auth.0.user_id.clone());
    state.db.insert_proposal(&proposal).await?;

    tracing::info!(proposal_id = %proposal.id, "Unit email proposed");

    Ok((StatusCode::CREATED, Json(proposal)))
}

// ============================================================================
// Helper Functions
// ============================================================================

async fn require_membership(
    state: &AppState,
    user_id: &str,
    branch_id: Uuid,
) -> Result<UserBranchRole, AppError> {
    state
        .db
        .find_active_membership(user_id, branch_id)
        .await?
        .ok_or_else(|| AppError::Forbidden(anyhow::anyhow!("You are not a member of this branch")))
}
