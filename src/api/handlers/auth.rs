//! Login, logout, and current-user handlers.

use axum::{
    extract::State,
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::auth::{Actor, AUTH_COOKIE};
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::permission::Permission;
use crate::models::user::User;
use crate::services::audit_service::AuditEntry;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub roles: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!("{AUTH_COOKIE}={token}; Path=/; Max-Age={max_age_secs}; HttpOnly; SameSite=Lax")
}

/// Authenticate and set the session cookie; the token is also returned in
/// the body for non-browser clients.
pub async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "email and password are required".to_string(),
        ));
    }

    let (user, token) = state.auth.login(&req.email, &req.password).await?;
    let roles = state.permissions.role_names(user.id).await?;

    state
        .audit
        .record(
            AuditEntry::new("auth.login")
                .actor(user.id)
                .target("user", user.id)
                .target_name(&user.email),
        )
        .await;

    let cookie = session_cookie(&token, state.config.jwt_expiry_hours * 3600);
    let body = Json(LoginResponse {
        token,
        user: UserResponse {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            roles,
        },
    });

    Ok((AppendHeaders([(SET_COOKIE, cookie)]), body))
}

/// Clear the session cookie. Token invalidation is client-side only; the
/// JWT itself stays valid until it expires.
pub async fn logout() -> impl IntoResponse {
    let cookie = format!("{AUTH_COOKIE}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax");
    (
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(super::MessageResponse::new("Logged out")),
    )
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: i64,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub roles: Vec<String>,
    pub permissions: Vec<Permission>,
}

/// The authenticated user with live roles and effective permissions.
pub async fn me(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<MeResponse>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(actor.user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", actor.user_id)))?;

    let roles = state.permissions.role_names(user.id).await?;
    let permissions = state.permissions.effective_permissions(user.id).await?;

    Ok(Json(MeResponse {
        id: user.id,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        roles,
        permissions,
    }))
}
