//! Access request model and lifecycle status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle state of an access request.
///
/// `Pending` is the only state transitions start from; `Approved` is the only
/// state `Revoked` can be reached from. Stored as uppercase TEXT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessStatus {
    Pending,
    Approved,
    Rejected,
    Revoked,
}

impl AccessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessStatus::Pending => "PENDING",
            AccessStatus::Approved => "APPROVED",
            AccessStatus::Rejected => "REJECTED",
            AccessStatus::Revoked => "REVOKED",
        }
    }
}

/// Access request entity; targets are polymorphic (target_type + target_id)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AccessRequest {
    pub id: i64,
    pub user_id: i64,
    pub request_type: String,
    pub target_type: String,
    pub target_id: i64,
    pub access_level: String,
    pub justification: Option<String>,
    pub status: AccessStatus,
    pub approved_by: Option<i64>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<i64>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Access request joined with requester and target display fields for listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AccessRequestDetail {
    pub id: i64,
    pub user_id: i64,
    pub user_email: String,
    pub request_type: String,
    pub target_type: String,
    pub target_id: i64,
    pub target_name: Option<String>,
    pub access_level: String,
    pub justification: Option<String>,
    pub status: AccessStatus,
    pub approved_by: Option<i64>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<i64>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
