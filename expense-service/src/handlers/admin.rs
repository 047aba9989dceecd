//! Group administration handlers.
//!
//! Everything here is scoped to the group the caller administers,
//! resolved through an active admin membership on one of its branches.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::middleware::auth::AuthUser;
use crate::models::access_request::AccessRequestDetails;
use crate::models::branch::BranchSummary;
use crate::models::email_proposal::ProposalDetails;
use crate::models::{Branch, ProposalStatus, UnitEmailProposal};
use crate::utils::ValidatedJson;
use crate::AppState;
use service_core::error::AppError;

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct GroupResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub admin_user_id: String,
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct BranchListResponse {
    pub branches: Vec<BranchSummary>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBranchRequest {
    #[validate(length(min = 1, message = "Branch name is required"))]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBranchRequest {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct PendingRequestsResponse {
    pub requests: Vec<AccessRequestDetails>,
}

#[derive(Debug, Serialize)]
pub struct ProposalListResponse {
    pub proposals: Vec<ProposalDetails>,
}

#[derive(Debug, Deserialize)]
pub struct DecideProposalRequest {
    pub action: ProposalAction,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalAction {
    Validate,
    Refuse,
}

// ============================================================================
// Handlers
// ============================================================================

/// The caller's group record.
///
/// GET /admin/group
#[tracing::instrument(skip_all)]
pub async fn get_group(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<GroupResponse>, AppError> {
    let group_id = require_administered_group(&state, &auth.0.user_id).await?;

    let group = state
        .db
        .find_group_by_id(group_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Group not found")))?;

    Ok(Json(GroupResponse {
        id: group.id,
        name: group.name,
        slug: group.slug,
        admin_user_id: group.admin_user_id,
        is_active: group.is_active,
    }))
}

/// Pending access requests for the caller's group.
///
/// GET /admin/pending-requests
#[tracing::instrument(skip_all)]
pub async fn list_pending_requests(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<PendingRequestsResponse>, AppError> {
    let group_id = require_administered_group(&state, &auth.0.user_id).await?;
    let requests = state.db.list_pending_requests(group_id).await?;
    Ok(Json(PendingRequestsResponse { requests }))
}

/// All branches of the caller's group with active member counts.
///
/// GET /admin/branches
#[tracing::instrument(skip_all)]
pub async fn list_branches(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<BranchListResponse>, AppError> {
    let group_id = require_administered_group(&state, &auth.0.user_id).await?;
    let branches = state.db.list_group_branches(group_id).await?;
    Ok(Json(BranchListResponse { branches }))
}

/// Create a branch in the caller's group.
///
/// POST /admin/branches
#[tracing::instrument(skip(state, auth, req), fields(user_id = %auth.0.user_id))]
pub async fn create_branch(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateBranchRequest>,
) -> Result<(StatusCode, Json<BranchSummary>), AppError> {
    let group_id = require_administered_group(&state, &auth.0.user_id).await?;

    let branch = Branch::new(req.name, group_id);
    state.db.insert_branch(&branch).await?;

    tracing::info!(branch_id = %branch.id, name = %branch.name, "Branch created");

    Ok((
        StatusCode::CREATED,
        Json(BranchSummary {
            id: branch.id,
            name: branch.name,
            is_active: branch.is_active,
            member_count: 0,
        }),
    ))
}

/// Rename or (de)activate a branch.
///
/// PATCH /admin/branches/{id}
#[tracing::instrument(skip(state, auth, req), fields(user_id = %auth.0.user_id))]
pub async fn update_branch(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(branch_id): Path<Uuid>,
    Json(req): Json<UpdateBranchRequest>,
) -> Result<Json<Branch>, AppError> {
    if req.name.is_none() && req.is_active.is_none() {
        return Err(AppError::BadRequest(anyhow::anyhow!("Nothing to update")));
    }

    let branch = state
        .db
        .find_branch_by_id(branch_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Branch not found")))?;

    if !state
        .db
        .has_admin_membership_in_group(&auth.0.user_id, branch.group_id)
        .await?
    {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "You are not an administrator of this branch's group"
        )));
    }

    let updated = state
        .db
        .update_branch(branch_id, req.name.as_deref(), req.is_active)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Branch not found")))?;

    Ok(Json(updated))
}

/// Unit email proposals across all branches the caller administers.
///
/// GET /admin/proposals
#[tracing::instrument(skip_all)]
pub async fn list_proposals(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ProposalListResponse>, AppError> {
    let branch_ids = state
        .db
        .list_administered_branch_ids(&auth.0.user_id)
        .await?;

    if branch_ids.is_empty() {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "No administered branches found"
        )));
    }

    let proposals = state.db.list_proposals_for_branches(&branch_ids).await?;
    Ok(Json(ProposalListResponse { proposals }))
}

/// Validate or refuse a unit email proposal.
///
/// PUT /admin/proposals/{id}
#[tracing::instrument(skip(state, auth, req), fields(user_id = %auth.0.user_id))]
pub async fn decide_proposal(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(proposal_id): Path<Uuid>,
    Json(req): Json<DecideProposalRequest>,
) -> Result<Json<UnitEmailProposal>, AppError> {
    let proposal = state
        .db
        .find_proposal_by_id(proposal_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Proposal not found")))?;

    let membership = state
        .db
        .find_active_membership(&auth.0.user_id, proposal.branch_id)
        .await?;
    if !membership.map(|m| m.is_admin()).unwrap_or(false) {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "You are not allowed to decide this proposal"
        )));
    }

    if !proposal.is_proposed() {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Proposal has already been processed"
        )));
    }

    let status = match req.action {
        ProposalAction::Validate => ProposalStatus::Validated,
        ProposalAction::Refuse => ProposalStatus::Refused,
    };

    let updated = state
        .db
        .decide_proposal(proposal_id, status, &auth.0.user_id)
        .await?;

    tracing::info!(
        proposal_id = %updated.id,
        status = %updated.status,
        "Unit email proposal decided"
    );

    Ok(Json(updated))
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolve the group the caller administers; 403 when they administer none.
async fn require_administered_group(state: &AppState, user_id: &str) -> Result<Uuid, AppError> {
    state
        .db
        .find_administered_group_id(user_id)
        .await?
        .ok_or_else(|| AppError::Forbidden(anyhow::anyhow!("Access denied")))
}
