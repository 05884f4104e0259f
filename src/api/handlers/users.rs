//! User management handlers.

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
use crate::models::permission::Permission;
use crate::models::role::Role;
use crate::models::user::{User, UserPatch};
use crate::services::audit_service::AuditEntry;
use crate::services::AuthService;

use super::{MessageResponse, MutationResponse};

async fn fetch_user(state: &SharedState, id: i64) -> Result<User> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))
}

pub async fn list_users(State(state): State<SharedState>) -> Result<Json<Vec<User>>> {
    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY email")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(users))
}

pub async fn get_user(State(state): State<SharedState>, Path(id): Path<i64>) -> Result<Json<User>> {
    Ok(Json(fetch_user(&state, id).await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

pub async fn create_user(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let email = req.email.trim();
    if email.is_empty() {
        return Err(AppError::Validation("email is required".to_string()));
    }
    if req.password.len() < 8 {
        return Err(AppError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }

    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE email = ?)")
        .bind(email)
        .fetch_one(&state.db)
        .await?;
    if exists {
        return Err(AppError::Conflict(format!("User '{email}' already exists")));
    }

    let password_hash = AuthService::hash_password(&req.password)?;
    let id = sqlx::query(
        "INSERT INTO users (email, password_hash, first_name, last_name) VALUES (?, ?, ?, ?)",
    )
    .bind(email)
    .bind(&password_hash)
    .bind(&req.first_name)
    .bind(&req.last_name)
    .execute(&state.db)
    .await?
    .last_insert_rowid();

    let user = fetch_user(&state, id).await?;

    state
        .audit
        .record(
            AuditEntry::new("users.create")
                .actor(actor.user_id)
                .target("user", id)
                .target_name(&user.email)
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_user(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(patch): Json<UserPatch>,
) -> Result<Json<User>> {
    if patch.is_empty() {
        return Err(AppError::Validation("No fields to update".to_string()));
    }

    let mut user = fetch_user(&state, id).await?;
    let old = json!({"email": user.email, "is_active": user.is_active});
    patch.apply(&mut user);

    sqlx::query(
        r#"
        UPDATE users
        SET email = ?, first_name = ?, last_name = ?, is_active = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(user.is_active)
    .bind(id)
    .execute(&state.db)
    .await?;

    let user = fetch_user(&state, id).await?;

    state
        .audit
        .record(
            AuditEntry::new("users.update")
                .actor(actor.user_id)
                .target("user", id)
                .target_name(&user.email)
                .old_value(old.to_string())
                .new_value(json!({"email": user.email, "is_active": user.is_active}).to_string())
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    if id == actor.user_id {
        return Err(AppError::Validation(
            "You cannot delete your own account".to_string(),
        ));
    }
    let user = fetch_user(&state, id).await?;

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;

    state
        .audit
        .record(
            AuditEntry::new("users.delete")
                .actor(actor.user_id)
                .target("user", id)
                .target_name(&user.email)
                .old_value(json!({"email": user.email}).to_string())
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok(Json(MessageResponse::new("User deleted")))
}

pub async fn get_user_roles(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Role>>> {
    fetch_user(&state, id).await?;
    let roles = sqlx::query_as::<_, Role>(
        r#"
        SELECT r.* FROM roles r
        JOIN user_roles ur ON ur.role_id = r.id
        WHERE ur.user_id = ?
        ORDER BY r.hierarchy_level DESC
        "#,
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(roles))
}

/// The user's effective permissions: role grants unioned with group grants.
pub async fn get_user_permissions(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Permission>>> {
    fetch_user(&state, id).await?;
    Ok(Json(state.permissions.effective_permissions(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role_id: i64,
}

pub async fn assign_role(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(req): Json<AssignRoleRequest>,
) -> Result<Json<MutationResponse>> {
    let user = fetch_user(&state, id).await?;
    let affected = state
        .memberships
        .assign_role(actor.user_id, id, req.role_id)
        .await?;

    state
        .audit
        .record(
            AuditEntry::new("roles.assign")
                .actor(actor.user_id)
                .target("user", id)
                .target_name(&user.email)
                .new_value(json!({"role_id": req.role_id}).to_string())
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok(Json(MutationResponse { affected }))
}

pub async fn remove_role(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Path((id, role_id)): Path<(i64, i64)>,
) -> Result<Json<MutationResponse>> {
    let user = fetch_user(&state, id).await?;
    let affected = state.memberships.remove_role(id, role_id).await?;

    state
        .audit
        .record(
            AuditEntry::new("roles.unassign")
                .actor(actor.user_id)
                .target("user", id)
                .target_name(&user.email)
                .old_value(json!({"role_id": role_id}).to_string())
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok(Json(MutationResponse { affected }))
}
