//! Permission model and update patch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::merge;

/// Permission entity; names follow the dotted `<category>.<verb>` convention
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Permission {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

/// Partial update for a permission.
#[derive(Debug, Default, Deserialize)]
pub struct PermissionPatch {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

impl PermissionPatch {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.description.is_none() && self.category.is_none()
    }

    pub fn apply(self, permission: &mut Permission) {
        merge(&mut permission.display_name, self.display_name);
        merge(&mut permission.description, self.description.map(Some));
        merge(&mut permission.category, self.category);
    }
}
