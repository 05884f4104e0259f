//! Access request lifecycle: request, approve, reject, grant, revoke.

use chrono::{Duration, Utc};
use sqlx::SqlitePool;

use crate::error::{AppError, Result};
use crate::models::access_request::{AccessRequest, AccessRequestDetail, AccessStatus};

/// Input for a user-initiated access request.
#[derive(Debug, Clone)]
pub struct NewAccessRequest {
    pub target_type: String,
    pub target_id: i64,
    pub request_type: Option<String>,
    pub access_level: Option<String>,
    pub justification: Option<String>,
    pub duration_minutes: Option<i64>,
}

/// Listing filters; unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct AccessRequestFilter {
    pub status: Option<AccessStatus>,
    pub user_id: Option<i64>,
    pub target_type: Option<String>,
}

/// Input for an administrative grant that skips the pending state.
#[derive(Debug, Clone)]
pub struct DirectGrant {
    pub user_id: i64,
    pub target_type: String,
    pub target_id: i64,
    pub access_level: Option<String>,
    pub justification: Option<String>,
    pub duration_minutes: Option<i64>,
}

#[derive(Clone)]
pub struct AccessService {
    db: SqlitePool,
}

impl AccessService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a pending request on behalf of `user_id`.
    ///
    /// At most one pending request may exist per (user, target); a duplicate
    /// is a conflict. Tool targets must reference an existing tool.
    pub async fn create_request(
        &self,
        user_id: i64,
        req: NewAccessRequest,
    ) -> Result<AccessRequest> {
        if req.target_type.is_empty() || req.target_id == 0 {
            return Err(AppError::Validation(
                "target_type and target_id are required".to_string(),
            ));
        }
        if req.target_type == "tool" {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM tools WHERE id = ?)",
            )
            .bind(req.target_id)
            .fetch_one(&self.db)
            .await?;
            if !exists {
                return Err(AppError::Validation(format!(
                    "Tool {} does not exist",
                    req.target_id
                )));
            }
        }

        let duplicate = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM access_requests
                WHERE user_id = ? AND target_type = ? AND target_id = ?
                  AND status = 'PENDING'
            )
            "#,
        )
        .bind(user_id)
        .bind(&req.target_type)
        .bind(req.target_id)
        .fetch_one(&self.db)
        .await?;
        if duplicate {
            return Err(AppError::Conflict(
                "A pending request for this target already exists".to_string(),
            ));
        }

        let id = sqlx::query(
            r#"
            INSERT INTO access_requests
                (user_id, request_type, target_type, target_id, access_level,
                 justification, duration_minutes)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(req.request_type.as_deref().unwrap_or("tool_access"))
        .bind(&req.target_type)
        .bind(req.target_id)
        .bind(req.access_level.as_deref().unwrap_or("read"))
        .bind(&req.justification)
        .bind(req.duration_minutes)
        .execute(&self.db)
        .await?
        .last_insert_rowid();

        self.get(id).await
    }

    /// Approve a pending request.
    ///
    /// The transition is guarded in SQL by `status = 'PENDING'`, so a
    /// concurrent or repeated approval affects zero rows and is reported as
    /// such rather than failing. A duration supplied at decision time takes
    /// precedence over the requested one; without a positive duration from
    /// either side the grant is permanent.
    pub async fn approve(
        &self,
        request_id: i64,
        approver_id: i64,
        duration_minutes: Option<i64>,
    ) -> Result<u64> {
        let request = self.get(request_id).await?;
        let minutes = duration_minutes
            .filter(|minutes| *minutes > 0)
            .or_else(|| request.duration_minutes.filter(|minutes| *minutes > 0));
        let expires_at = minutes.map(|minutes| Utc::now() + Duration::minutes(minutes));

        let result = sqlx::query(
            r#"
            UPDATE access_requests
            SET status = 'APPROVED', approved_by = ?, approved_at = ?,
                expires_at = ?, updated_at = ?
            WHERE id = ? AND status = 'PENDING'
            "#,
        )
        .bind(approver_id)
        .bind(Utc::now())
        .bind(expires_at)
        .bind(Utc::now())
        .bind(request_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    /// Reject a pending request; a reason is mandatory.
    pub async fn reject(&self, request_id: i64, rejecter_id: i64, reason: &str) -> Result<u64> {
        if reason.trim().is_empty() {
            return Err(AppError::Validation(
                "A rejection reason is required".to_string(),
            ));
        }
        self.get(request_id).await?;

        let result = sqlx::query(
            r#"
            UPDATE access_requests
            SET status = 'REJECTED', rejected_by = ?, rejected_at = ?,
                rejection_reason = ?, updated_at = ?
            WHERE id = ? AND status = 'PENDING'
            "#,
        )
        .bind(rejecter_id)
        .bind(Utc::now())
        .bind(reason)
        .bind(Utc::now())
        .bind(request_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    /// Grant access directly: the row is born approved, attributed to the
    /// granter, and never passes through the pending state.
    pub async fn direct_grant(&self, granter_id: i64, grant: DirectGrant) -> Result<AccessRequest> {
        if grant.user_id == 0 || grant.target_type.is_empty() || grant.target_id == 0 {
            return Err(AppError::Validation(
                "user_id, target_type and target_id are required".to_string(),
            ));
        }
        let now = Utc::now();
        let expires_at = grant
            .duration_minutes
            .filter(|minutes| *minutes > 0)
            .map(|minutes| now + Duration::minutes(minutes));

        let id = sqlx::query(
            r#"
            INSERT INTO access_requests
                (user_id, request_type, target_type, target_id, access_level,
                 justification, duration_minutes, status, approved_by,
                 approved_at, expires_at)
            VALUES (?, 'direct_grant', ?, ?, ?, ?, ?, 'APPROVED', ?, ?, ?)
            "#,
        )
        .bind(grant.user_id)
        .bind(&grant.target_type)
        .bind(grant.target_id)
        .bind(grant.access_level.as_deref().unwrap_or("read"))
        .bind(&grant.justification)
        .bind(grant.duration_minutes)
        .bind(granter_id)
        .bind(now)
        .bind(expires_at)
        .execute(&self.db)
        .await?
        .last_insert_rowid();

        self.get(id).await
    }

    /// Grant every user in `user_ids` access to every tool in `tool_ids`.
    ///
    /// Runs as one transaction over the cross product. Pairs where the user
    /// already holds an approved grant on the tool are skipped; the returned
    /// count is the number of grants actually created.
    pub async fn bulk_grant(
        &self,
        granter_id: i64,
        user_ids: &[i64],
        tool_ids: &[i64],
        access_level: Option<&str>,
        duration_minutes: Option<i64>,
    ) -> Result<u64> {
        if user_ids.is_empty() || tool_ids.is_empty() {
            return Err(AppError::Validation(
                "user_ids and tool_ids must be non-empty".to_string(),
            ));
        }

        let now = Utc::now();
        let expires_at = duration_minutes
            .filter(|minutes| *minutes > 0)
            .map(|minutes| now + Duration::minutes(minutes));
        let level = access_level.unwrap_or("read");

        let mut tx = self.db.begin().await?;
        let mut granted = 0;
        for user_id in user_ids {
            for tool_id in tool_ids {
                let exists = sqlx::query_scalar::<_, bool>(
                    r#"
                    SELECT EXISTS (
                        SELECT 1 FROM access_requests
                        WHERE user_id = ? AND target_type = 'tool' AND target_id = ?
                          AND status = 'APPROVED'
                    )
                    "#,
                )
                .bind(user_id)
                .bind(tool_id)
                .fetch_one(&mut *tx)
                .await?;
                if exists {
                    continue;
                }

                sqlx::query(
                    r#"
                    INSERT INTO access_requests
                        (user_id, request_type, target_type, target_id, access_level,
                         duration_minutes, status, approved_by, approved_at, expires_at)
                    VALUES (?, 'direct_grant', 'tool', ?, ?, ?, 'APPROVED', ?, ?, ?)
                    "#,
                )
                .bind(user_id)
                .bind(tool_id)
                .bind(level)
                .bind(duration_minutes)
                .bind(granter_id)
                .bind(now)
                .bind(expires_at)
                .execute(&mut *tx)
                .await?;
                granted += 1;
            }
        }
        tx.commit().await?;
        Ok(granted)
    }

    /// Revoke every approved grant a user holds on a target.
    ///
    /// Revoking a target the user has no approved access to affects zero
    /// rows; that is a success, not an error.
    pub async fn revoke(
        &self,
        user_id: i64,
        target_type: &str,
        target_id: i64,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE access_requests
            SET status = 'REVOKED', updated_at = ?
            WHERE user_id = ? AND target_type = ? AND target_id = ?
              AND status = 'APPROVED'
            "#,
        )
        .bind(Utc::now())
        .bind(user_id)
        .bind(target_type)
        .bind(target_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    /// Whether the user currently holds unexpired approved access.
    ///
    /// Expiry is evaluated here at read time; the stored status stays
    /// APPROVED past the deadline.
    pub async fn has_valid_access(
        &self,
        user_id: i64,
        target_type: &str,
        target_id: i64,
    ) -> Result<bool> {
        let valid = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM access_requests
                WHERE user_id = ? AND target_type = ? AND target_id = ?
                  AND status = 'APPROVED'
                  AND (expires_at IS NULL OR expires_at > ?)
            )
            "#,
        )
        .bind(user_id)
        .bind(target_type)
        .bind(target_id)
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await?;
        Ok(valid)
    }

    pub async fn get(&self, id: i64) -> Result<AccessRequest> {
        sqlx::query_as::<_, AccessRequest>("SELECT * FROM access_requests WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Access request {id} not found")))
    }

    /// List requests matching the filter, newest first.
    pub async fn list(&self, filter: &AccessRequestFilter) -> Result<Vec<AccessRequestDetail>> {
        let requests = sqlx::query_as::<_, AccessRequestDetail>(
            r#"
            SELECT ar.id, ar.user_id, u.email AS user_email, ar.request_type,
                   ar.target_type, ar.target_id, t.display_name AS target_name,
                   ar.access_level, ar.justification, ar.status, ar.approved_by,
                   ar.approved_at, ar.rejected_by, ar.rejected_at,
                   ar.rejection_reason, ar.expires_at, ar.created_at
            FROM access_requests ar
            JOIN users u ON u.id = ar.user_id
            LEFT JOIN tools t ON ar.target_type = 'tool' AND t.id = ar.target_id
            WHERE (?1 IS NULL OR ar.status = ?1)
              AND (?2 IS NULL OR ar.user_id = ?2)
              AND (?3 IS NULL OR ar.target_type = ?3)
            ORDER BY ar.created_at DESC, ar.id DESC
            LIMIT 500
            "#,
        )
        .bind(filter.status)
        .bind(filter.user_id)
        .bind(&filter.target_type)
        .fetch_all(&self.db)
        .await?;
        Ok(requests)
    }

    /// The approval queue: pending requests, oldest first.
    pub async fn pending(&self) -> Result<Vec<AccessRequestDetail>> {
        let requests = sqlx::query_as::<_, AccessRequestDetail>(
            r#"
            SELECT ar.id, ar.user_id, u.email AS user_email, ar.request_type,
                   ar.target_type, ar.target_id, t.display_name AS target_name,
                   ar.access_level, ar.justification, ar.status, ar.approved_by,
                   ar.approved_at, ar.rejected_by, ar.rejected_at,
                   ar.rejection_reason, ar.expires_at, ar.created_at
            FROM access_requests ar
            JOIN users u ON u.id = ar.user_id
            LEFT JOIN tools t ON ar.target_type = 'tool' AND t.id = ar.target_id
            WHERE ar.status = 'PENDING'
            ORDER BY ar.created_at ASC, ar.id ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(requests)
    }

    /// All requests made by one user, newest first.
    pub async fn for_user(&self, user_id: i64) -> Result<Vec<AccessRequestDetail>> {
        let requests = sqlx::query_as::<_, AccessRequestDetail>(
            r#"
            SELECT ar.id, ar.user_id, u.email AS user_email, ar.request_type,
                   ar.target_type, ar.target_id, t.display_name AS target_name,
                   ar.access_level, ar.justification, ar.status, ar.approved_by,
                   ar.approved_at, ar.rejected_by, ar.rejected_at,
                   ar.rejection_reason, ar.expires_at, ar.created_at
            FROM access_requests ar
            JOIN users u ON u.id = ar.user_id
            LEFT JOIN tools t ON ar.target_type = 'tool' AND t.id = ar.target_id
            WHERE ar.user_id = ?
            ORDER BY ar.created_at DESC, ar.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(requests)
    }
}
