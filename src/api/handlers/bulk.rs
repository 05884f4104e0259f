//! Bulk assignment handlers: cross-product mutations in one transaction.

use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use serde_json::json;

use crate::api::middleware::auth::Actor;
use crate::api::SharedState;
use crate::error::Result;
use crate::services::audit_service::AuditEntry;

use super::MutationResponse;

#[derive(Debug, Deserialize)]
pub struct UserRolesRequest {
    pub user_ids: Vec<i64>,
    pub role_ids: Vec<i64>,
}

/// Assign every listed role to every listed user. Existing assignments are
/// skipped; `affected` counts only new links.
pub async fn assign_user_roles(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<UserRolesRequest>,
) -> Result<Json<MutationResponse>> {
    let affected = state
        .memberships
        .bulk_assign_roles(actor.user_id, &req.user_ids, &req.role_ids)
        .await?;

    state
        .audit
        .record(
            AuditEntry::new("roles.bulk_assign")
                .actor(actor.user_id)
                .new_value(
                    json!({"user_ids": req.user_ids, "role_ids": req.role_ids, "affected": affected})
                        .to_string(),
                )
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok(Json(MutationResponse { affected }))
}

pub async fn remove_user_roles(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<UserRolesRequest>,
) -> Result<Json<MutationResponse>> {
    let affected = state
        .memberships
        .bulk_remove_roles(&req.user_ids, &req.role_ids)
        .await?;

    state
        .audit
        .record(
            AuditEntry::new("roles.bulk_remove")
                .actor(actor.user_id)
                .old_value(
                    json!({"user_ids": req.user_ids, "role_ids": req.role_ids, "affected": affected})
                        .to_string(),
                )
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok(Json(MutationResponse { affected }))
}

#[derive(Debug, Deserialize)]
pub struct GroupMembersRequest {
    pub user_ids: Vec<i64>,
    pub group_ids: Vec<i64>,
}

pub async fn add_group_members(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<GroupMembersRequest>,
) -> Result<Json<MutationResponse>> {
    let affected = state
        .memberships
        .bulk_add_to_groups(actor.user_id, &req.user_ids, &req.group_ids)
        .await?;

    state
        .audit
        .record(
            AuditEntry::new("groups.bulk_add_members")
                .actor(actor.user_id)
                .new_value(
                    json!({"user_ids": req.user_ids, "group_ids": req.group_ids, "affected": affected})
                        .to_string(),
                )
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok(Json(MutationResponse { affected }))
}

#[derive(Debug, Deserialize)]
pub struct GroupPermissionsRequest {
    pub group_ids: Vec<i64>,
    pub permission_ids: Vec<i64>,
}

pub async fn assign_group_permissions(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<GroupPermissionsRequest>,
) -> Result<Json<MutationResponse>> {
    let affected = state
        .memberships
        .bulk_assign_group_permissions(&req.group_ids, &req.permission_ids)
        .await?;

    state
        .audit
        .record(
            AuditEntry::new("groups.bulk_permissions")
                .actor(actor.user_id)
                .new_value(
                    json!({"group_ids": req.group_ids, "permission_ids": req.permission_ids, "affected": affected})
                        .to_string(),
                )
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok(Json(MutationResponse { affected }))
}

#[derive(Debug, Deserialize)]
pub struct ToolGrantsRequest {
    pub user_ids: Vec<i64>,
    pub tool_ids: Vec<i64>,
    pub access_level: Option<String>,
    pub duration_minutes: Option<i64>,
}

/// Grant every listed user access to every listed tool. Pairs with an
/// existing approved grant are skipped.
pub async fn grant_tool_access(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<ToolGrantsRequest>,
) -> Result<Json<MutationResponse>> {
    let affected = state
        .access
        .bulk_grant(
            actor.user_id,
            &req.user_ids,
            &req.tool_ids,
            req.access_level.as_deref(),
            req.duration_minutes,
        )
        .await?;

    state
        .audit
        .record(
            AuditEntry::new("access.bulk_grant")
                .actor(actor.user_id)
                .new_value(
                    json!({"user_ids": req.user_ids, "tool_ids": req.tool_ids, "affected": affected})
                        .to_string(),
                )
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok(Json(MutationResponse { affected }))
}
