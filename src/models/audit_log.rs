//! Audit log model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Append-only audit record joined with the actor's email; rows are never
/// updated or deleted.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditLogDetail {
    pub id: i64,
    pub action: String,
    pub action_category: String,
    pub actor_id: Option<i64>,
    pub actor_email: Option<String>,
    pub target_type: Option<String>,
    pub target_id: Option<i64>,
    pub target_name: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}
