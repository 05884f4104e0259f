//! Group management handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;

use crate::api::middleware::auth::Actor;
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::group::{Group, GroupPatch};
use crate::models::permission::Permission;
use crate::services::audit_service::AuditEntry;

use super::{MessageResponse, MutationResponse};

async fn fetch_group(state: &SharedState, id: i64) -> Result<Group> {
    sqlx::query_as::<_, Group>("SELECT * FROM groups WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Group {id} not found")))
}

#[derive(Debug, Serialize, FromRow)]
pub struct GroupRow {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List groups with member counts.
pub async fn list_groups(State(state): State<SharedState>) -> Result<Json<Vec<GroupRow>>> {
    let groups = sqlx::query_as::<_, GroupRow>(
        r#"
        SELECT g.id, g.name, g.display_name, g.description,
               COUNT(ugm.user_id) AS member_count, g.created_at, g.updated_at
        FROM groups g
        LEFT JOIN user_group_members ugm ON ugm.group_id = g.id
        GROUP BY g.id
        ORDER BY g.name
        "#,
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(groups))
}

pub async fn get_group(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<Group>> {
    Ok(Json(fetch_group(&state, id).await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
}

pub async fn create_group(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<Group>)> {
    if req.name.trim().is_empty() || req.display_name.trim().is_empty() {
        return Err(AppError::Validation(
            "name and display_name are required".to_string(),
        ));
    }

    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM groups WHERE name = ?)")
        .bind(req.name.trim())
        .fetch_one(&state.db)
        .await?;
    if exists {
        return Err(AppError::Conflict(format!(
            "Group '{}' already exists",
            req.name.trim()
        )));
    }

    let id = sqlx::query("INSERT INTO groups (name, display_name, description) VALUES (?, ?, ?)")
        .bind(req.name.trim())
        .bind(req.display_name.trim())
        .bind(&req.description)
        .execute(&state.db)
        .await?
        .last_insert_rowid();

    let group = fetch_group(&state, id).await?;

    state
        .audit
        .record(
            AuditEntry::new("groups.create")
                .actor(actor.user_id)
                .target("group", id)
                .target_name(&group.name)
                .new_value(json!({"name": group.name}).to_string())
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn update_group(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(patch): Json<GroupPatch>,
) -> Result<Json<Group>> {
    if patch.is_empty() {
        return Err(AppError::Validation("No fields to update".to_string()));
    }

    let mut group = fetch_group(&state, id).await?;
    let old = json!({"display_name": group.display_name, "description": group.description});
    patch.apply(&mut group);

    sqlx::query(
        "UPDATE groups SET display_name = ?, description = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(&group.display_name)
    .bind(&group.description)
    .bind(id)
    .execute(&state.db)
    .await?;

    let group = fetch_group(&state, id).await?;

    state
        .audit
        .record(
            AuditEntry::new("groups.update")
                .actor(actor.user_id)
                .target("group", id)
                .target_name(&group.name)
                .old_value(old.to_string())
                .new_value(
                    json!({"display_name": group.display_name, "description": group.description})
                        .to_string(),
                )
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok(Json(group))
}

pub async fn delete_group(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    let group = fetch_group(&state, id).await?;

    sqlx::query("DELETE FROM groups WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;

    state
        .audit
        .record(
            AuditEntry::new("groups.delete")
                .actor(actor.user_id)
                .target("group", id)
                .target_name(&group.name)
                .old_value(json!({"name": group.name}).to_string())
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok(Json(MessageResponse::new("Group deleted")))
}

#[derive(Debug, Serialize, FromRow)]
pub struct GroupMember {
    pub user_id: i64,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub added_at: DateTime<Utc>,
}

pub async fn list_members(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<GroupMember>>> {
    fetch_group(&state, id).await?;
    let members = sqlx::query_as::<_, GroupMember>(
        r#"
        SELECT u.id AS user_id, u.email, u.first_name, u.last_name, ugm.added_at
        FROM user_group_members ugm
        JOIN users u ON u.id = ugm.user_id
        WHERE ugm.group_id = ?
        ORDER BY u.email
        "#,
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(members))
}

#[derive(Debug, Deserialize)]
pub struct AddMembersRequest {
    pub user_ids: Vec<i64>,
}

/// Add users to a group; already-present members are skipped.
pub async fn add_members(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(req): Json<AddMembersRequest>,
) -> Result<Json<MutationResponse>> {
    let group = fetch_group(&state, id).await?;
    let affected = state
        .memberships
        .add_group_members(actor.user_id, id, &req.user_ids)
        .await?;

    state
        .audit
        .record(
            AuditEntry::new("groups.add_members")
                .actor(actor.user_id)
                .target("group", id)
                .target_name(&group.name)
                .new_value(json!({"user_ids": req.user_ids}).to_string())
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok(Json(MutationResponse { affected }))
}

pub async fn remove_member(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Path((id, user_id)): Path<(i64, i64)>,
) -> Result<Json<MutationResponse>> {
    let group = fetch_group(&state, id).await?;
    let affected = state.memberships.remove_group_member(id, user_id).await?;

    state
        .audit
        .record(
            AuditEntry::new("groups.remove_member")
                .actor(actor.user_id)
                .target("group", id)
                .target_name(&group.name)
                .old_value(json!({"user_id": user_id}).to_string())
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok(Json(MutationResponse { affected }))
}

pub async fn get_group_permissions(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Permission>>> {
    fetch_group(&state, id).await?;
    let permissions = sqlx::query_as::<_, Permission>(
        r#"
        SELECT p.* FROM permissions p
        JOIN group_permissions gp ON gp.permission_id = p.id
        WHERE gp.group_id = ?
        ORDER BY p.category, p.name
        "#,
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(permissions))
}

#[derive(Debug, Deserialize)]
pub struct SetPermissionsRequest {
    pub permission_ids: Vec<i64>,
}

/// Replace a group's permission set atomically; an empty list clears it.
pub async fn set_group_permissions(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(req): Json<SetPermissionsRequest>,
) -> Result<Json<MessageResponse>> {
    let group = fetch_group(&state, id).await?;
    state
        .memberships
        .set_group_permissions(id, &req.permission_ids)
        .await?;

    state
        .audit
        .record(
            AuditEntry::new("groups.set_permissions")
                .actor(actor.user_id)
                .target("group", id)
                .target_name(&group.name)
                .new_value(json!({"permission_ids": req.permission_ids}).to_string())
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok(Json(MessageResponse::new("Group permissions updated")))
}
