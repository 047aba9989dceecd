//! Access request handlers.
//!
//! Implements the membership application workflow:
//! - Request access with a group invite code
//! - List the caller's own requests
//! - Approve or reject a pending request as the group administrator

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
use crate::models::AccessRequest;
use crate::utils::ValidatedJson;
use crate::AppState;
use service_core::error::AppError;

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccessRequest {
    #[validate(length(min = 1, message = "Group code is required"))]
    pub group_code: String,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccessRequestResponse {
    pub id: Uuid,
    pub status: String,
    pub group_name: String,
    pub branch_name: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct DecisionRequest {
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RequestListResponse {
    pub requests: Vec<AccessRequestDetails>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Request access to a group using its invite code.
///
/// POST /access/requests
#[tracing::instrument(skip(state, auth), fields(user_id = %auth.0.user_id))]
pub async fn create_request(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateAccessRequest>,
) -> Result<(StatusCode, Json<AccessRequestResponse>), AppError> {
    let identity = auth.0;

    let group = state
        .db
        .find_group_by_slug(&req.group_code)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Unknown group code")))?;

    // Requests land on the group's first active branch; the admin can move
    // the member later.
    let branch = state
        .db
        .find_first_active_branch(group.id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("No active branch available in this group"))
        })?;

    if state
        .db
        .find_pending_request(&identity.user_id, branch.id)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "You already have a pending request for this group"
        )));
    }

    let request = AccessRequest::new(
        identity.email.clone(),
        group.id,
        branch.id,
        Some(identity.user_id.clone()),
        req.message,
    );
    state.db.insert_access_request(&request).await?;

    tracing::info!(
        request_id = %request.id,
        group = %group.name,
        branch = %branch.name,
        "Access request created"
    );

    Ok((
        StatusCode::CREATED,
        Json(AccessRequestResponse {
            id: request.id,
            status: request.status,
            group_name: group.name,
            branch_name: branch.name,
        }),
    ))
}

/// List the caller's own access requests.
///
/// GET /access/requests
#[tracing::instrument(skip_all)]
pub async fn list_my_requests(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<RequestListResponse>, AppError> {
    let requests = state.db.list_requests_for_user(&auth.0.user_id).await?;
    Ok(Json(RequestListResponse { requests }))
}

/// Approve a pending request as the group administrator.
///
/// POST /access/requests/{id}/approve
#[tracing::instrument(skip(state, auth, req), fields(user_id = %auth.0.user_id))]
pub async fn approve_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(request_id): Path<Uuid>,
    req: Option<Json<DecisionRequest>>,
) -> Result<Json<AccessRequestResponse>, AppError> {
    let comment = req.and_then(|Json(r)| r.comment);
    let (request, group_name, branch_name) =
        load_pending_request(&state, &auth.0.user_id, request_id, "approve").await?;

    state
        .db
        .approve_request(&request, &auth.0.user_id, comment)
        .await?;

    tracing::info!(request_id = %request.id, "Access request approved");

    Ok(Json(AccessRequestResponse {
        id: request.id,
        status: "approved".to_string(),
        group_name,
        branch_name,
    }))
}

/// Reject a pending request as the group administrator.
///
/// POST /access/requests/{id}/reject
#[tracing::instrument(skip(state, auth, req), fields(user_id = %auth.0.user_id))]
pub async fn reject_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(request_id): Path<Uuid>,
    req: Option<Json<DecisionRequest>>,
) -> Result<Json<AccessRequestResponse>, AppError> {
    let comment = req.and_then(|Json(r)| r.comment);
    let (request, group_name, branch_name) =
        load_pending_request(&state, &auth.0.user_id, request_id, "reject").await?;

    state
        .db
        .reject_request(&request, &auth.0.user_id, comment)
        .await?;

    tracing::info!(request_id = %request.id, "Access request rejected");

    Ok(Json(AccessRequestResponse {
        id: request.id,
        status: "rejected".to_string(),
        group_name,
        branch_name,
    }))
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Shared guard chain for both decisions: request exists (404), is still
/// pending (409), and the caller administers the owning group (403).
async fn load_pending_request(
    state: &AppState,
    user_id: &str,
    request_id: Uuid,
    action: &str,
) -> Result<(AccessRequest, String, String), AppError> {
    let request = state
        .db
        .find_request_by_id(request_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Request not found")))?;

    if !request.is_pending() {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Request has already been processed"
        )));
    }

    if !state.db.is_group_admin(request.group_id, user_id).await? {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "You are not allowed to {} this request",
            action
        )));
    }

    let group = state
        .db
        .find_group_by_id(request.group_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Group not found")))?;
    let branch = state
        .db
        .find_branch_by_id(request.branch_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Branch not found")))?;

    Ok((request, group.name, branch.name))
}
