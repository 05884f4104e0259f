//! Authorization guards layered onto route groups.
//!
//! Each guard assumes `auth_middleware` ran first and left an [`Actor`] in
//! the request extensions. Checks always re-resolve against the database;
//! the role names inside the token are never trusted for authorization.
//! Rejections are terminal and not audited.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::api::middleware::auth::Actor;
use crate::api::SharedState;
use crate::error::AppError;

/// Guard configuration: the caller must hold one of the named roles.
#[derive(Clone)]
pub struct RequiredRoles {
    pub state: SharedState,
    pub any_of: &'static [&'static str],
}

pub async fn require_any_role(
    State(requirement): State<RequiredRoles>,
    request: Request,
    next: Next,
) -> Response {
    let Some(actor) = request.extensions().get::<Actor>() else {
        return AppError::Authentication("Authentication required".to_string()).into_response();
    };

    match requirement
        .state
        .permissions
        .has_any_role(actor.user_id, requirement.any_of)
        .await
    {
        Ok(true) => next.run(request).await,
        Ok(false) => AppError::Authorization(format!(
            "Requires one of roles: {}",
            requirement.any_of.join(", ")
        ))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Guard configuration: the caller must hold the named permission.
#[derive(Clone)]
pub struct RequiredPermission {
    pub state: SharedState,
    pub permission: &'static str,
}

pub async fn require_permission(
    State(requirement): State<RequiredPermission>,
    request: Request,
    next: Next,
) -> Response {
    let Some(actor) = request.extensions().get::<Actor>() else {
        return AppError::Authentication("Authentication required".to_string()).into_response();
    };

    match requirement
        .state
        .permissions
        .has_permission(actor.user_id, requirement.permission)
        .await
    {
        Ok(true) => next.run(request).await,
        Ok(false) => AppError::Authorization(format!(
            "Missing required permission: {}",
            requirement.permission
        ))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Guard configuration: the caller's highest role must meet a hierarchy level.
#[derive(Clone)]
pub struct RequiredHierarchy {
    pub state: SharedState,
    pub min_level: i64,
}

pub async fn require_hierarchy(
    State(requirement): State<RequiredHierarchy>,
    request: Request,
    next: Next,
) -> Response {
    let Some(actor) = request.extensions().get::<Actor>() else {
        return AppError::Authentication("Authentication required".to_string()).into_response();
    };

    match requirement
        .state
        .permissions
        .meets_hierarchy(actor.user_id, requirement.min_level)
        .await
    {
        Ok(true) => next.run(request).await,
        Ok(false) => AppError::Authorization(format!(
            "Requires hierarchy level {} or above",
            requirement.min_level
        ))
        .into_response(),
        Err(e) => e.into_response(),
    }
}
