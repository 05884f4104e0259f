//! Tool model and update patch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::merge;

/// Tool entity: a protected resource users request access to
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Tool {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub icon: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update for a tool.
#[derive(Debug, Default, Deserialize)]
pub struct ToolPatch {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub icon: Option<String>,
    pub is_active: Option<bool>,
}

impl ToolPatch {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.icon.is_none()
            && self.is_active.is_none()
    }

    pub fn apply(self, tool: &mut Tool) {
        merge(&mut tool.display_name, self.display_name);
        merge(&mut tool.description, self.description.map(Some));
        merge(&mut tool.category, self.category.map(Some));
        merge(&mut tool.icon, self.icon.map(Some));
        merge(&mut tool.is_active, self.is_active);
    }
}
