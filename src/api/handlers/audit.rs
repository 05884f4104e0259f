//! Audit trail query handlers.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::SharedState;
use crate::error::Result;
use crate::models::audit_log::AuditLogDetail;
use crate::services::audit_service::AuditQuery;

#[derive(Debug, Serialize)]
pub struct AuditListResponse {
    pub items: Vec<AuditLogDetail>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Paginated, filterable audit listing.
pub async fn list_audit_logs(
    State(state): State<SharedState>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<AuditListResponse>> {
    let items = state.audit.list(&query).await?;
    let total = state.audit.count(&query).await?;

    Ok(Json(AuditListResponse {
        items,
        total,
        limit: query.limit.unwrap_or(50).clamp(1, 500),
        offset: query.offset.unwrap_or(0).max(0),
    }))
}

pub async fn audit_categories(State(state): State<SharedState>) -> Result<Json<Vec<String>>> {
    Ok(Json(state.audit.categories().await?))
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub category: Option<String>,
}

/// Capped JSON export of the trail, oldest first.
pub async fn export_audit_logs(
    State(state): State<SharedState>,
    Query(query): Query<ExportQuery>,
) -> Result<Json<Vec<AuditLogDetail>>> {
    Ok(Json(state.audit.export(query.category.as_deref()).await?))
}
