//! Permission catalog handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::middleware::auth::Actor;
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::permission::{Permission, PermissionPatch};
use crate::services::audit_service::AuditEntry;

use super::MessageResponse;

async fn fetch_permission(state: &SharedState, id: i64) -> Result<Permission> {
    sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Permission {id} not found")))
}

pub async fn list_permissions(State(state): State<SharedState>) -> Result<Json<Vec<Permission>>> {
    let permissions =
        sqlx::query_as::<_, Permission>("SELECT * FROM permissions ORDER BY category, name")
            .fetch_all(&state.db)
            .await?;
    Ok(Json(permissions))
}

pub async fn get_permission(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<Permission>> {
    Ok(Json(fetch_permission(&state, id).await?))
}

pub async fn permission_categories(State(state): State<SharedState>) -> Result<Json<Vec<String>>> {
    let categories =
        sqlx::query_scalar::<_, String>("SELECT DISTINCT category FROM permissions ORDER BY category")
            .fetch_all(&state.db)
            .await?;
    Ok(Json(categories))
}

#[derive(Debug, Deserialize)]
pub struct CreatePermissionRequest {
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub category: Option<String>,
}

/// Create a permission. The category defaults to the dotted prefix of the
/// name, matching the seeded catalog convention.
pub async fn create_permission(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<CreatePermissionRequest>,
) -> Result<(StatusCode, Json<Permission>)> {
    let name = req.name.trim();
    if name.is_empty() || req.display_name.trim().is_empty() {
        return Err(AppError::Validation(
            "name and display_name are required".to_string(),
        ));
    }

    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM permissions WHERE name = ?)")
            .bind(name)
            .fetch_one(&state.db)
            .await?;
    if exists {
        return Err(AppError::Conflict(format!(
            "Permission '{name}' already exists"
        )));
    }

    let category = req
        .category
        .clone()
        .unwrap_or_else(|| match name.split_once('.') {
            Some((prefix, _)) if !prefix.is_empty() => prefix.to_string(),
            _ => "general".to_string(),
        });

    let id = sqlx::query(
        "INSERT INTO permissions (name, display_name, description, category) VALUES (?, ?, ?, ?)",
    )
    .bind(name)
    .bind(req.display_name.trim())
    .bind(&req.description)
    .bind(&category)
    .execute(&state.db)
    .await?
    .last_insert_rowid();

    let permission = fetch_permission(&state, id).await?;

    state
        .audit
        .record(
            AuditEntry::new("permissions.create")
                .actor(actor.user_id)
                .target("permission", id)
                .target_name(&permission.name)
                .new_value(json!({"name": permission.name, "category": permission.category}).to_string())
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok((StatusCode::CREATED, Json(permission)))
}

pub async fn update_permission(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(patch): Json<PermissionPatch>,
) -> Result<Json<Permission>> {
    if patch.is_empty() {
        return Err(AppError::Validation("No fields to update".to_string()));
    }

    let mut permission = fetch_permission(&state, id).await?;
    let old = json!({
        "display_name": permission.display_name,
        "category": permission.category,
    });
    patch.apply(&mut permission);

    sqlx::query("UPDATE permissions SET display_name = ?, description = ?, category = ? WHERE id = ?")
        .bind(&permission.display_name)
        .bind(&permission.description)
        .bind(&permission.category)
        .bind(id)
        .execute(&state.db)
        .await?;

    let permission = fetch_permission(&state, id).await?;

    state
        .audit
        .record(
            AuditEntry::new("permissions.update")
                .actor(actor.user_id)
                .target("permission", id)
                .target_name(&permission.name)
                .old_value(old.to_string())
                .new_value(
                    json!({
                        "display_name": permission.display_name,
                        "category": permission.category,
                    })
                    .to_string(),
                )
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok(Json(permission))
}

/// Delete a permission; role and group links cascade away with it.
pub async fn delete_permission(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    let permission = fetch_permission(&state, id).await?;

    sqlx::query("DELETE FROM permissions WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;

    state
        .audit
        .record(
            AuditEntry::new("permissions.delete")
                .actor(actor.user_id)
                .target("permission", id)
                .target_name(&permission.name)
                .old_value(json!({"name": permission.name}).to_string())
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok(Json(MessageResponse::new("Permission deleted")))
}
