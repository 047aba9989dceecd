//! PostgreSQL database service for the expense service.
//!
//! Uses sqlx with runtime-checked queries. Decision flows (approve/reject,
//! proposal validation) run inside explicit transactions with a
//! conditional status update as the single-writer guard.

use service_core::error::AppError;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::models::access_request::AccessRequestDetails;
use crate::models::branch::{BranchSummary, BranchWithGroup};
use crate::models::email_proposal::ProposalDetails;
use crate::models::{
    AccessRequest, Branch, Decision, Group, ProposalStatus, RequestStatus, Role, UnitEmailProposal,
    UserBranchRole, UserSession, Validation,
};

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

/// A branch together with the caller's role on it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserBranch {
    pub id: Uuid,
    pub name: String,
    pub group_id: Uuid,
    pub is_active: bool,
    pub role: String,
}

impl Database {
    /// Create a new database wrapper from a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Health check - ping the database.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                AppError::DatabaseError(anyhow::anyhow!("Database health check failed: {}", e))
            })?;
        Ok(())
    }

    // ==================== Group Operations ====================

    /// Find group by its slug (invite code, case-insensitive).
    pub async fn find_group_by_slug(&self, slug: &str) -> Result<Option<Group>, AppError> {
        sqlx::query_as::<_, Group>("SELECT * FROM groups WHERE slug = LOWER($1)")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Find group by ID.
    pub async fn find_group_by_id(&self, group_id: Uuid) -> Result<Option<Group>, AppError> {
        sqlx::query_as::<_, Group>("SELECT * FROM groups WHERE id = $1")
            .bind(group_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Insert a new group.
    pub async fn insert_group(&self, group: &Group) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO groups (id, name, slug, admin_user_id, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(group.id)
        .bind(&group.name)
        .bind(&group.slug)
        .bind(&group.admin_user_id)
        .bind(group.is_active)
        .bind(group.created_at)
        .bind(group.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Whether the user is the owning administrator of the group.
    pub async fn is_group_admin(&self, group_id: Uuid, user_id: &str) -> Result<bool, AppError> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM groups WHERE id = $1 AND admin_user_id = $2",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(row.is_some())
    }

    /// Resolve the group a user administers through an active admin
    /// membership on one of its branches.
    pub async fn find_administered_group_id(
        &self,
        user_id: &str,
    ) -> Result<Option<Uuid>, AppError> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT b.group_id FROM user_branch_roles ubr
            JOIN branches b ON ubr.branch_id = b.id
            WHERE ubr.user_id = $1 AND ubr.is_active = TRUE AND ubr.role = $2
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(Role::Admin.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(row.map(|(id,)| id))
    }

    // ==================== Branch Operations ====================

    /// Find branch by ID.
    pub async fn find_branch_by_id(&self, branch_id: Uuid) -> Result<Option<Branch>, AppError> {
        sqlx::query_as::<_, Branch>("SELECT * FROM branches WHERE id = $1")
            .bind(branch_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Find an active branch joined with its group.
    pub async fn find_branch_with_group(
        &self,
        branch_id: Uuid,
    ) -> Result<Option<BranchWithGroup>, AppError> {
        sqlx::query_as::<_, BranchWithGroup>(
            r#"
            SELECT b.id, b.name, b.group_id, g.name AS group_name,
                   g.slug AS group_slug, b.is_active
            FROM branches b
            JOIN groups g ON b.group_id = g.id
            WHERE b.id = $1 AND b.is_active = TRUE
            "#,
        )
        .bind(branch_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// First active branch of a group, used as the default target when a
    /// request arrives with only a group code.
    pub async fn find_first_active_branch(
        &self,
        group_id: Uuid,
    ) -> Result<Option<Branch>, AppError> {
        sqlx::query_as::<_, Branch>(
            r#"
            SELECT * FROM branches
            WHERE group_id = $1 AND is_active = TRUE
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// All branches of a group with their active member counts.
    pub async fn list_group_branches(
        &self,
        group_id: Uuid,
    ) -> Result<Vec<BranchSummary>, AppError> {
        sqlx::query_as::<_, BranchSummary>(
            r#"
            SELECT b.id, b.name, b.is_active,
                   COUNT(ubr.id) FILTER (WHERE ubr.is_active = TRUE) AS member_count
            FROM branches b
            LEFT JOIN user_branch_roles ubr ON ubr.branch_id = b.id
            WHERE b.group_id = $1
            GROUP BY b.id, b.name, b.is_active
            ORDER BY b.name
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Insert a new branch.
    pub async fn insert_branch(&self, branch: &Branch) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO branches (id, name, group_id, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(branch.id)
        .bind(&branch.name)
        .bind(branch.group_id)
        .bind(branch.is_active)
        .bind(branch.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Update a branch's name and/or active flag; returns the updated row.
    pub async fn update_branch(
        &self,
        branch_id: Uuid,
        name: Option<&str>,
        is_active: Option<bool>,
    ) -> Result<Option<Branch>, AppError> {
        sqlx::query_as::<_, Branch>(
            r#"
            UPDATE branches
            SET name = COALESCE($2, name),
                is_active = COALESCE($3, is_active)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(branch_id)
        .bind(name)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    // ==================== Membership Operations ====================

    /// Find the user's active membership on a branch.
    pub async fn find_active_membership(
        &self,
        user_id: &str,
        branch_id: Uuid,
    ) -> Result<Option<UserBranchRole>, AppError> {
        sqlx::query_as::<_, UserBranchRole>(
            r#"
            SELECT * FROM user_branch_roles
            WHERE user_id = $1 AND branch_id = $2 AND is_active = TRUE
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(branch_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Whether the user holds an active admin membership on any branch of
    /// the group.
    pub async fn has_admin_membership_in_group(
        &self,
        user_id: &str,
        group_id: Uuid,
    ) -> Result<bool, AppError> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT ubr.id FROM user_branch_roles ubr
            JOIN branches b ON ubr.branch_id = b.id
            WHERE ubr.user_id = $1 AND b.group_id = $2
              AND ubr.is_active = TRUE AND ubr.role = $3
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(group_id)
        .bind(Role::Admin.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(row.is_some())
    }

    /// Active memberships of a branch, oldest grant first.
    pub async fn list_branch_members(
        &self,
        branch_id: Uuid,
    ) -> Result<Vec<UserBranchRole>, AppError> {
        sqlx::query_as::<_, UserBranchRole>(
            r#"
            SELECT * FROM user_branch_roles
            WHERE branch_id = $1 AND is_active = TRUE
            ORDER BY granted_at
            "#,
        )
        .bind(branch_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Branches the user belongs to, with their role on each.
    pub async fn list_user_branches(&self, user_id: &str) -> Result<Vec<UserBranch>, AppError> {
        sqlx::query_as::<_, UserBranch>(
            r#"
            SELECT b.id, b.name, b.group_id, b.is_active, ubr.role
            FROM user_branch_roles ubr
            JOIN branches b ON ubr.branch_id = b.id
            WHERE ubr.user_id = $1 AND ubr.is_active = TRUE
            ORDER BY b.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Branch IDs the user administers.
    pub async fn list_administered_branch_ids(
        &self,
        user_id: &str,
    ) -> Result<Vec<Uuid>, AppError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT branch_id FROM user_branch_roles
            WHERE user_id = $1 AND is_active = TRUE AND role = $2
            "#,
        )
        .bind(user_id)
        .bind(Role::Admin.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Insert a new membership.
    pub async fn insert_membership(&self, membership: &UserBranchRole) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO user_branch_roles
                (id, user_id, branch_id, role, is_active, granted_by, granted_at, last_access_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(membership.id)
        .bind(&membership.user_id)
        .bind(membership.branch_id)
        .bind(&membership.role)
        .bind(membership.is_active)
        .bind(&membership.granted_by)
        .bind(membership.granted_at)
        .bind(membership.last_access_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    // ==================== Access Request Operations ====================

    /// Find request by ID.
    pub async fn find_request_by_id(
        &self,
        request_id: Uuid,
    ) -> Result<Option<AccessRequest>, AppError> {
        sqlx::query_as::<_, AccessRequest>("SELECT * FROM access_requests WHERE id = $1")
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// The user's pending request for a branch, if any. Duplicate-request
    /// guard for new submissions.
    pub async fn find_pending_request(
        &self,
        user_id: &str,
        branch_id: Uuid,
    ) -> Result<Option<AccessRequest>, AppError> {
        sqlx::query_as::<_, AccessRequest>(
            r#"
            SELECT * FROM access_requests
            WHERE user_id = $1 AND branch_id = $2 AND status = $3
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(branch_id)
        .bind(RequestStatus::Pending.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Insert a new access request.
    pub async fn insert_access_request(&self, request: &AccessRequest) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO access_requests
                (id, email, group_id, branch_id, user_id, status, message, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(request.id)
        .bind(&request.email)
        .bind(request.group_id)
        .bind(request.branch_id)
        .bind(&request.user_id)
        .bind(&request.status)
        .bind(&request.message)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// The user's own requests with group and branch names.
    pub async fn list_requests_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<AccessRequestDetails>, AppError> {
        sqlx::query_as::<_, AccessRequestDetails>(
            r#"
            SELECT ar.id, ar.email, ar.status, ar.message, ar.created_at, ar.updated_at,
                   g.name AS group_name, b.name AS branch_name
            FROM access_requests ar
            JOIN groups g ON ar.group_id = g.id
            JOIN branches b ON ar.branch_id = b.id
            WHERE ar.user_id = $1
            ORDER BY ar.created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Pending requests of a group with group and branch names.
    pub async fn list_pending_requests(
        &self,
        group_id: Uuid,
    ) -> Result<Vec<AccessRequestDetails>, AppError> {
        sqlx::query_as::<_, AccessRequestDetails>(
            r#"
            SELECT ar.id, ar.email, ar.status, ar.message, ar.created_at, ar.updated_at,
                   g.name AS group_name, b.name AS branch_name
            FROM access_requests ar
            JOIN groups g ON ar.group_id = g.id
            JOIN branches b ON ar.branch_id = b.id
            WHERE ar.group_id = $1 AND ar.status = $2
            ORDER BY ar.created_at
            "#,
        )
        .bind(group_id)
        .bind(RequestStatus::Pending.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Approve a pending request: record the decision, flip the status and
    /// grant membership, all in one transaction.
    ///
    /// The conditional status update is the single-writer guard: a
    /// concurrent or repeated approval sees zero updated rows and the
    /// whole transaction rolls back with a conflict.
    pub async fn approve_request(
        &self,
        request: &AccessRequest,
        validator_user_id: &str,
        comment: Option<String>,
    ) -> Result<(), AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        let updated = sqlx::query(
            r#"
            UPDATE access_requests
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = $3
            "#,
        )
        .bind(request.id)
        .bind(RequestStatus::Approved.as_str())
        .bind(RequestStatus::Pending.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        if updated.rows_affected() != 1 {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Request has already been processed"
            )));
        }

        let validation = Validation::new(
            request.id,
            validator_user_id.to_string(),
            Decision::Approved,
            comment,
        );
        insert_validation(&mut tx, &validation).await?;

        // New users become members by default
        if let Some(user_id) = &request.user_id {
            let membership = UserBranchRole::new(
                user_id.clone(),
                request.branch_id,
                Role::Member,
                Some(validator_user_id.to_string()),
            );
            sqlx::query(
                r#"
                INSERT INTO user_branch_roles
                    (id, user_id, branch_id, role, is_active, granted_by, granted_at, last_access_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(membership.id)
            .bind(&membership.user_id)
            .bind(membership.branch_id)
            .bind(&membership.role)
            .bind(membership.is_active)
            .bind(&membership.granted_by)
            .bind(membership.granted_at)
            .bind(membership.last_access_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Reject a pending request: record the decision and flip the status
    /// in one transaction. No membership is created.
    pub async fn reject_request(
        &self,
        request: &AccessRequest,
        validator_user_id: &str,
        comment: Option<String>,
    ) -> Result<(), AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        let updated = sqlx::query(
            r#"
            UPDATE access_requests
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = $3
            "#,
        )
        .bind(request.id)
        .bind(RequestStatus::Rejected.as_str())
        .bind(RequestStatus::Pending.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        if updated.rows_affected() != 1 {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Request has already been processed"
            )));
        }

        let validation = Validation::new(
            request.id,
            validator_user_id.to_string(),
            Decision::Rejected,
            comment,
        );
        insert_validation(&mut tx, &validation).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    // ==================== Unit Email Proposal Operations ====================

    /// Find proposal by ID.
    pub async fn find_proposal_by_id(
        &self,
        proposal_id: Uuid,
    ) -> Result<Option<UnitEmailProposal>, AppError> {
        sqlx::query_as::<_, UnitEmailProposal>(
            "SELECT * FROM unit_email_proposals WHERE id = $1",
        )
        .bind(proposal_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// The branch's proposal currently in 'proposed' state, if any.
    pub async fn find_proposed_for_branch(
        &self,
        branch_id: Uuid,
    ) -> Result<Option<UnitEmailProposal>, AppError> {
        sqlx::query_as::<_, UnitEmailProposal>(
            r#"
            SELECT * FROM unit_email_proposals
            WHERE branch_id = $1 AND status = $2
            LIMIT 1
            "#,
        )
        .bind(branch_id)
        .bind(ProposalStatus::Proposed.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Insert a new proposal.
    pub async fn insert_proposal(&self, proposal: &UnitEmailProposal) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO unit_email_proposals
                (id, branch_id, email, status, proposed_by, validated_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(proposal.id)
        .bind(proposal.branch_id)
        .bind(&proposal.email)
        .bind(&proposal.status)
        .bind(&proposal.proposed_by)
        .bind(&proposal.validated_by)
        .bind(proposal.created_at)
        .bind(proposal.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// All proposals of one branch, oldest first.
    pub async fn list_proposals_for_branch(
        &self,
        branch_id: Uuid,
    ) -> Result<Vec<UnitEmailProposal>, AppError> {
        sqlx::query_as::<_, UnitEmailProposal>(
            r#"
            SELECT * FROM unit_email_proposals
            WHERE branch_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(branch_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Proposals across a set of branches with branch and group names.
    pub async fn list_proposals_for_branches(
        &self,
        branch_ids: &[Uuid],
    ) -> Result<Vec<ProposalDetails>, AppError> {
        sqlx::query_as::<_, ProposalDetails>(
            r#"
            SELECT p.id, p.email, p.status, p.proposed_by, p.validated_by,
                   p.created_at, p.updated_at,
                   b.name AS branch_name, g.name AS group_name
            FROM unit_email_proposals p
            JOIN branches b ON p.branch_id = b.id
            JOIN groups g ON b.group_id = g.id
            WHERE p.branch_id = ANY($1)
            ORDER BY p.created_at
            "#,
        )
        .bind(branch_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Validate or refuse a proposal. The conditional update guards the
    /// proposed -> {validated, refused} transition; deciding a proposal
    /// that is no longer 'proposed' is a conflict.
    pub async fn decide_proposal(
        &self,
        proposal_id: Uuid,
        status: ProposalStatus,
        validator_user_id: &str,
    ) -> Result<UnitEmailProposal, AppError> {
        sqlx::query_as::<_, UnitEmailProposal>(
            r#"
            UPDATE unit_email_proposals
            SET status = $2, validated_by = $3, updated_at = NOW()
            WHERE id = $1 AND status = $4
            RETURNING *
            "#,
        )
        .bind(proposal_id)
        .bind(status.as_str())
        .bind(validator_user_id)
        .bind(ProposalStatus::Proposed.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?
        .ok_or_else(|| {
            AppError::Conflict(anyhow::anyhow!("Proposal has already been processed"))
        })
    }

    /// The branch's validated unit email, if one exists.
    pub async fn find_validated_unit_email(
        &self,
        branch_id: Uuid,
    ) -> Result<Option<String>, AppError> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT email FROM unit_email_proposals
            WHERE branch_id = $1 AND status = $2
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(branch_id)
        .bind(ProposalStatus::Validated.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(row.map(|(email,)| email))
    }

    // ==================== Session Operations ====================

    /// Upsert the user's session with their active branch and device info.
    pub async fn upsert_active_branch(
        &self,
        user_id: &str,
        branch_id: Uuid,
        device_info: serde_json::Value,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO user_sessions (id, user_id, active_branch_id, last_seen, device_info)
            VALUES ($1, $2, $3, NOW(), $4)
            ON CONFLICT (user_id) DO UPDATE
            SET active_branch_id = EXCLUDED.active_branch_id,
                last_seen = NOW(),
                device_info = EXCLUDED.device_info
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(branch_id)
        .bind(device_info)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Find the user's session.
    pub async fn find_session(&self, user_id: &str) -> Result<Option<UserSession>, AppError> {
        sqlx::query_as::<_, UserSession>("SELECT * FROM user_sessions WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }
}

async fn insert_validation(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    validation: &Validation,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO validations (id, request_id, validator_user_id, decision, comment, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(validation.id)
    .bind(validation.request_id)
    .bind(&validation.validator_user_id)
    .bind(&validation.decision)
    .bind(&validation.comment)
    .bind(validation.created_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
    Ok(())
}
