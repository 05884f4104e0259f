//! Role management handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::middleware::auth::Actor;
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::permission::Permission;
use crate::models::role::{Role, RolePatch};
use crate::services::audit_service::AuditEntry;

use super::MessageResponse;

async fn fetch_role(state: &SharedState, id: i64) -> Result<Role> {
    sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Role {id} not found")))
}

/// List roles, highest hierarchy first.
pub async fn list_roles(State(state): State<SharedState>) -> Result<Json<Vec<Role>>> {
    let roles =
        sqlx::query_as::<_, Role>("SELECT * FROM roles ORDER BY hierarchy_level DESC, name")
            .fetch_all(&state.db)
            .await?;
    Ok(Json(roles))
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct RoleHierarchyEntry {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub hierarchy_level: i64,
    pub user_count: i64,
}

/// The role ladder with per-role member counts.
pub async fn role_hierarchy(
    State(state): State<SharedState>,
) -> Result<Json<Vec<RoleHierarchyEntry>>> {
    let entries = sqlx::query_as::<_, RoleHierarchyEntry>(
        r#"
        SELECT r.id, r.name, r.display_name, r.hierarchy_level,
               COUNT(ur.user_id) AS user_count
        FROM roles r
        LEFT JOIN user_roles ur ON ur.role_id = r.id
        GROUP BY r.id
        ORDER BY r.hierarchy_level DESC, r.name
        "#,
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(entries))
}

pub async fn get_role(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<Role>> {
    Ok(Json(fetch_role(&state, id).await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub hierarchy_level: Option<i64>,
    pub can_grant_access: Option<bool>,
    pub can_approve_requests: Option<bool>,
}

pub async fn create_role(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<CreateRoleRequest>,
) -> Result<(StatusCode, Json<Role>)> {
    if req.name.trim().is_empty() || req.display_name.trim().is_empty() {
        return Err(AppError::Validation(
            "name and display_name are required".to_string(),
        ));
    }

    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM roles WHERE name = ?)")
        .bind(req.name.trim())
        .fetch_one(&state.db)
        .await?;
    if exists {
        return Err(AppError::Conflict(format!(
            "Role '{}' already exists",
            req.name.trim()
        )));
    }

    let id = sqlx::query(
        r#"
        INSERT INTO roles (name, display_name, description, hierarchy_level,
                           can_grant_access, can_approve_requests)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(req.name.trim())
    .bind(req.display_name.trim())
    .bind(&req.description)
    .bind(req.hierarchy_level.unwrap_or(0))
    .bind(req.can_grant_access.unwrap_or(false))
    .bind(req.can_approve_requests.unwrap_or(false))
    .execute(&state.db)
    .await?
    .last_insert_rowid();

    let role = fetch_role(&state, id).await?;

    state
        .audit
        .record(
            AuditEntry::new("roles.create")
                .actor(actor.user_id)
                .target("role", role.id)
                .target_name(&role.name)
                .new_value(json!({"name": role.name, "hierarchy_level": role.hierarchy_level}).to_string())
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok((StatusCode::CREATED, Json(role)))
}

/// Update a role by merging a patch over the current row. System roles are
/// immutable.
pub async fn update_role(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(patch): Json<RolePatch>,
) -> Result<Json<Role>> {
    if patch.is_empty() {
        return Err(AppError::Validation("No fields to update".to_string()));
    }

    let mut role = fetch_role(&state, id).await?;
    if role.is_system_role {
        return Err(AppError::Authorization(
            "System roles cannot be modified".to_string(),
        ));
    }

    let old = json!({
        "display_name": role.display_name,
        "hierarchy_level": role.hierarchy_level,
        "can_grant_access": role.can_grant_access,
        "can_approve_requests": role.can_approve_requests,
    });
    patch.apply(&mut role);

    sqlx::query(
        r#"
        UPDATE roles
        SET display_name = ?, description = ?, hierarchy_level = ?,
            can_grant_access = ?, can_approve_requests = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(&role.display_name)
    .bind(&role.description)
    .bind(role.hierarchy_level)
    .bind(role.can_grant_access)
    .bind(role.can_approve_requests)
    .bind(id)
    .execute(&state.db)
    .await?;

    let role = fetch_role(&state, id).await?;

    state
        .audit
        .record(
            AuditEntry::new("roles.update")
                .actor(actor.user_id)
                .target("role", id)
                .target_name(&role.name)
                .old_value(old.to_string())
                .new_value(
                    json!({
                        "display_name": role.display_name,
                        "hierarchy_level": role.hierarchy_level,
                        "can_grant_access": role.can_grant_access,
                        "can_approve_requests": role.can_approve_requests,
                    })
                    .to_string(),
                )
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok(Json(role))
}

/// Delete a role. System roles are immutable.
pub async fn delete_role(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    let role = fetch_role(&state, id).await?;
    if role.is_system_role {
        return Err(AppError::Authorization(
            "System roles cannot be deleted".to_string(),
        ));
    }

    sqlx::query("DELETE FROM roles WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;

    state
        .audit
        .record(
            AuditEntry::new("roles.delete")
                .actor(actor.user_id)
                .target("role", id)
                .target_name(&role.name)
                .old_value(json!({"name": role.name}).to_string())
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok(Json(MessageResponse::new("Role deleted")))
}

pub async fn get_role_permissions(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Permission>>> {
    fetch_role(&state, id).await?;
    let permissions = sqlx::query_as::<_, Permission>(
        r#"
        SELECT p.* FROM permissions p
        JOIN role_permissions rp ON rp.permission_id = p.id
        WHERE rp.role_id = ?
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

/// Replace a role's permission set atomically; an empty list clears it.
pub async fn set_role_permissions(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(req): Json<SetPermissionsRequest>,
) -> Result<Json<MessageResponse>> {
    let role = fetch_role(&state, id).await?;
    state
        .memberships
        .set_role_permissions(id, &req.permission_ids)
        .await?;

    state
        .audit
        .record(
            AuditEntry::new("roles.set_permissions")
                .actor(actor.user_id)
                .target("role", id)
                .target_name(&role.name)
                .new_value(json!({"permission_ids": req.permission_ids}).to_string())
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok(Json(MessageResponse::new("Role permissions updated")))
}
