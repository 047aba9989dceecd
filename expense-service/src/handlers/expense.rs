//! Expense submission handler.
//!
//! Validates the form, resolves the branch's validated unit email when a
//! branch id is given, and hands the rendered receipt to the email
//! provider.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::middleware::auth::AuthUser;
use crate::services::email::{decode_receipt_image, ExpenseEmail};
use crate::utils::ValidatedJson;
use crate::AppState;
use service_core::error::AppError;

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct SendExpenseRequest {
    #[validate(length(min = 1, message = "Date is required"))]
    pub date: String,
    #[validate(length(min = 1, message = "Branch is required"))]
    pub branch: String,
    #[validate(length(min = 1, message = "Expense type is required"))]
    pub expense_type: String,
    #[validate(length(min = 1, message = "Amount is required"))]
    pub amount: String,
    pub description: Option<String>,
    #[validate(length(min = 1, message = "Receipt image is required"))]
    pub image_data: String,
    pub file_name: Option<String>,
    pub branch_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct SendExpenseResponse {
    pub message_id: String,
    pub unit_email_included: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Send an expense receipt to the group treasury.
///
/// POST /expenses/send
#[tracing::instrument(skip(state, auth, req), fields(user_id = %auth.0.user_id))]
pub async fn send_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<SendExpenseRequest>,
) -> Result<Json<SendExpenseResponse>, AppError> {
    let amount: f64 = req
        .amount
        .trim()
        .replace(',', ".")
        .parse()
        .map_err(|_| AppError::BadRequest(anyhow::anyhow!("Amount is not a number")))?;
    if amount <= 0.0 {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Amount must be positive"
        )));
    }

    let image = decode_receipt_image(&req.image_data)?;

    // Unit email CC only applies when the submitter actually belongs to
    // the branch they named.
    let (group_name, unit_email) = match req.branch_id {
        Some(branch_id) => {
            let membership = state
                .db
                .find_active_membership(&auth.0.user_id, branch_id)
                .await?;
            if membership.is_none() {
                return Err(AppError::Forbidden(anyhow::anyhow!(
                    "You are not a member of this branch"
                )));
            }

            let branch = state
                .db
                .find_branch_with_group(branch_id)
                .await?
                .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Branch not found")))?;
            let unit_email = state.db.find_validated_unit_email(branch_id).await?;
            (branch.group_name, unit_email)
        }
        None => ("Scouts et Guides de France".to_string(), None),
    };

    let file_name = req
        .file_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| format!("receipt-{}.jpg", req.date));

    let email = ExpenseEmail {
        user_email: auth.0.email.clone(),
        date: req.date,
        branch: req.branch,
        expense_type: req.expense_type,
        amount: format!("{:.2}", amount),
        description: req.description.filter(|d| !d.trim().is_empty()),
        image,
        file_name,
        group_name,
        unit_email: unit_email.clone(),
    };

    let message_id = state.email.send_expense(&email).await?;

    tracing::info!(
        branch = %email.branch,
        amount = %email.amount,
        unit_email_included = unit_email.is_some(),
        "Expense receipt submitted"
    );

    Ok(Json(SendExpenseResponse {
        message_id,
        unit_email_included: unit_email.is_some(),
    }))
}
