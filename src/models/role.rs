//! Role model and update patch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::merge;

/// Role entity with hierarchy rank and workflow capability flags
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub hierarchy_level: i64,
    pub can_grant_access: bool,
    pub can_approve_requests: bool,
    pub is_system_role: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update for a role; unset fields keep their current value.
#[derive(Debug, Default, Deserialize)]
pub struct RolePatch {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub hierarchy_level: Option<i64>,
    pub can_grant_access: Option<bool>,
    pub can_approve_requests: Option<bool>,
}

impl RolePatch {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.description.is_none()
            && self.hierarchy_level.is_none()
            && self.can_grant_access.is_none()
            && self.can_approve_requests.is_none()
    }

    /// Overlay this patch on the current row.
    pub fn apply(self, role: &mut Role) {
        merge(&mut role.display_name, self.display_name);
        merge(&mut role.description, self.description.map(Some));
        merge(&mut role.hierarchy_level, self.hierarchy_level);
        merge(&mut role.can_grant_access, self.can_grant_access);
        merge(&mut role.can_approve_requests, self.can_approve_requests);
    }
}
