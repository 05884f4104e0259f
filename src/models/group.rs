//! Group model and update patch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::merge;

/// Group entity; an orthogonal, non-hierarchical path to permission grants
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update for a group.
#[derive(Debug, Default, Deserialize)]
pub struct GroupPatch {
    pub display_name: Option<String>,
    pub description: Option<String>,
}

impl GroupPatch {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.description.is_none()
    }

    pub fn apply(self, group: &mut Group) {
        merge(&mut group.display_name, self.display_name);
        merge(&mut group.description, self.description.map(Some));
    }
}
