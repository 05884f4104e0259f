//! First-boot setup: create the initial super admin account.

use axum::{
    extract::State,
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::auth::AUTH_COOKIE;
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::user::User;
use crate::services::audit_service::AuditEntry;
use crate::services::AuthService;

#[derive(Debug, Serialize)]
pub struct SetupStatusResponse {
    pub setup_required: bool,
}

/// Whether the instance still needs its first account.
pub async fn check_setup(State(state): State<SharedState>) -> Result<Json<SetupStatusResponse>> {
    let users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(&state.db)
        .await?;
    Ok(Json(SetupStatusResponse {
        setup_required: users == 0,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SetupRequest {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SetupResponse {
    pub token: String,
    pub user_id: i64,
}

/// Create the first user and make them a super admin, then log them in.
///
/// Only available while the instance has zero users; afterwards the endpoint
/// is permanently forbidden.
pub async fn setup(
    State(state): State<SharedState>,
    Json(req): Json<SetupRequest>,
) -> Result<impl IntoResponse> {
    if req.email.trim().is_empty() {
        return Err(AppError::Validation("email is required".to_string()));
    }
    if req.password.len() < 8 {
        return Err(AppError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }

    let users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(&state.db)
        .await?;
    if users > 0 {
        return Err(AppError::Authorization(
            "Setup has already been completed".to_string(),
        ));
    }

    let password_hash = AuthService::hash_password(&req.password)?;

    let mut tx = state.db.begin().await?;
    let user_id = sqlx::query(
        "INSERT INTO users (email, password_hash, first_name, last_name) VALUES (?, ?, ?, ?)",
    )
    .bind(req.email.trim())
    .bind(&password_hash)
    .bind(&req.first_name)
    .bind(&req.last_name)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let role_id = sqlx::query_scalar::<_, i64>("SELECT id FROM roles WHERE name = 'super_admin'")
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Internal("super_admin role is not seeded".to_string()))?;

    sqlx::query("INSERT INTO user_roles (user_id, role_id, granted_by) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(role_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(&state.db)
        .await?;
    let token = state
        .auth
        .generate_token(&user, vec!["super_admin".to_string()])?;

    state
        .audit
        .record(
            AuditEntry::new("auth.setup")
                .actor(user_id)
                .target("user", user_id)
                .target_name(&user.email),
        )
        .await;

    let cookie = format!(
        "{AUTH_COOKIE}={token}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        state.config.jwt_expiry_hours * 3600
    );
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(SetupResponse { token, user_id }),
    ))
}
