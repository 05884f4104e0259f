//! Append-only audit trail: best-effort recording and querying.

use serde::Deserialize;
use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::audit_log::AuditLogDetail;

/// One audit event, built up before recording.
#[derive(Debug, Clone, Default)]
pub struct AuditEntry {
    pub action: String,
    pub actor_id: Option<i64>,
    pub target_type: Option<String>,
    pub target_id: Option<i64>,
    pub target_name: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl AuditEntry {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Default::default()
        }
    }

    pub fn actor(mut self, actor_id: i64) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn target(mut self, target_type: impl Into<String>, target_id: i64) -> Self {
        self.target_type = Some(target_type.into());
        self.target_id = Some(target_id);
        self
    }

    pub fn target_name(mut self, name: impl Into<String>) -> Self {
        self.target_name = Some(name.into());
        self
    }

    pub fn old_value(mut self, value: impl Into<String>) -> Self {
        self.old_value = Some(value.into());
        self
    }

    pub fn new_value(mut self, value: impl Into<String>) -> Self {
        self.new_value = Some(value.into());
        self
    }

    pub fn client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }
}

/// Derive the category from a dotted action name.
///
/// `access.approve` categorizes as `access`; an undotted action falls back
/// to the target type, then to the action itself.
pub fn action_category(action: &str, target_type: Option<&str>) -> String {
    match action.split_once('.') {
        Some((prefix, _)) if !prefix.is_empty() => prefix.to_string(),
        _ => target_type.unwrap_or(action).to_string(),
    }
}

/// Query parameters for audit listings. `action` matches as a substring;
/// date bounds accept any form SQLite's datetime() parses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    pub category: Option<String>,
    pub actor_id: Option<i64>,
    pub action: Option<String>,
    pub target_type: Option<String>,
    pub target_id: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
}

#[derive(Clone)]
pub struct AuditService {
    db: SqlitePool,
}

impl AuditService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Record an audit event.
    ///
    /// Recording never fails the operation being audited: insert errors are
    /// logged and swallowed.
    pub async fn record(&self, entry: AuditEntry) {
        let category = action_category(&entry.action, entry.target_type.as_deref());

        let result = sqlx::query(
            r#"
            INSERT INTO audit_logs
                (action, action_category, actor_id, target_type, target_id,
                 target_name, old_value, new_value, ip_address, user_agent)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.action)
        .bind(&category)
        .bind(entry.actor_id)
        .bind(&entry.target_type)
        .bind(entry.target_id)
        .bind(&entry.target_name)
        .bind(&entry.old_value)
        .bind(&entry.new_value)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .execute(&self.db)
        .await;

        if let Err(e) = result {
            tracing::warn!(action = %entry.action, error = %e, "Failed to record audit entry");
        }
    }

    /// List audit entries newest-first with optional filters and paging.
    pub async fn list(&self, query: &AuditQuery) -> Result<Vec<AuditLogDetail>> {
        // Sort input is mapped onto a fixed column set, never interpolated.
        let sort_by = match query.sort_by.as_deref() {
            Some("action") => "al.action",
            Some("action_category") => "al.action_category",
            Some("actor_id") => "al.actor_id",
            _ => "al.created_at",
        };
        let sort_dir = match query.sort_dir.as_deref() {
            Some("asc") => "ASC",
            _ => "DESC",
        };
        let sql = format!(
            r#"
            SELECT al.id, al.action, al.action_category, al.actor_id,
                   u.email AS actor_email, al.target_type, al.target_id,
                   al.target_name, al.old_value, al.new_value, al.ip_address,
                   al.user_agent, al.created_at
            FROM audit_logs al
            LEFT JOIN users u ON u.id = al.actor_id
            WHERE (?1 IS NULL OR al.action_category = ?1)
              AND (?2 IS NULL OR al.actor_id = ?2)
              AND (?3 IS NULL OR al.action LIKE '%' || ?3 || '%')
              AND (?4 IS NULL OR al.target_type = ?4)
              AND (?5 IS NULL OR al.target_id = ?5)
              AND (?6 IS NULL OR datetime(al.created_at) >= datetime(?6))
              AND (?7 IS NULL OR datetime(al.created_at) <= datetime(?7))
            ORDER BY {sort_by} {sort_dir}, al.id {sort_dir}
            LIMIT ?8 OFFSET ?9
            "#
        );

        let entries = sqlx::query_as::<_, AuditLogDetail>(&sql)
            .bind(&query.category)
            .bind(query.actor_id)
            .bind(&query.action)
            .bind(&query.target_type)
            .bind(query.target_id)
            .bind(&query.start_date)
            .bind(&query.end_date)
            .bind(query.limit.unwrap_or(50).clamp(1, 500))
            .bind(query.offset.unwrap_or(0).max(0))
            .fetch_all(&self.db)
            .await?;
        Ok(entries)
    }

    pub async fn count(&self, query: &AuditQuery) -> Result<i64> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM audit_logs al
            WHERE (?1 IS NULL OR al.action_category = ?1)
              AND (?2 IS NULL OR al.actor_id = ?2)
              AND (?3 IS NULL OR al.action LIKE '%' || ?3 || '%')
              AND (?4 IS NULL OR al.target_type = ?4)
              AND (?5 IS NULL OR al.target_id = ?5)
              AND (?6 IS NULL OR datetime(al.created_at) >= datetime(?6))
              AND (?7 IS NULL OR datetime(al.created_at) <= datetime(?7))
            "#,
        )
        .bind(&query.category)
        .bind(query.actor_id)
        .bind(&query.action)
        .bind(&query.target_type)
        .bind(query.target_id)
        .bind(&query.start_date)
        .bind(&query.end_date)
        .fetch_one(&self.db)
        .await?;
        Ok(total)
    }

    /// Distinct categories present in the trail.
    pub async fn categories(&self) -> Result<Vec<String>> {
        let categories = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT action_category FROM audit_logs ORDER BY action_category",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(categories)
    }

    /// Capped export of matching entries, oldest first.
    pub async fn export(&self, category: Option<&str>) -> Result<Vec<AuditLogDetail>> {
        let entries = sqlx::query_as::<_, AuditLogDetail>(
            r#"
            SELECT al.id, al.action, al.action_category, al.actor_id,
                   u.email AS actor_email, al.target_type, al.target_id,
                   al.target_name, al.old_value, al.new_value, al.ip_address,
                   al.user_agent, al.created_at
            FROM audit_logs al
            LEFT JOIN users u ON u.id = al.actor_id
            WHERE (?1 IS NULL OR al.action_category = ?1)
            ORDER BY al.created_at ASC, al.id ASC
            LIMIT 10000
            "#,
        )
        .bind(category)
        .fetch_all(&self.db)
        .await?;
        Ok(entries)
    }
}
