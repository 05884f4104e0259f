//! Access request workflow handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::auth::Actor;
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::access_request::{AccessRequest, AccessRequestDetail, AccessStatus};
use crate::services::access_service::{AccessRequestFilter, DirectGrant, NewAccessRequest};
use crate::services::audit_service::AuditEntry;

use super::MutationResponse;

fn parse_status(value: &str) -> Result<AccessStatus> {
    match value.to_ascii_uppercase().as_str() {
        "PENDING" => Ok(AccessStatus::Pending),
        "APPROVED" => Ok(AccessStatus::Approved),
        "REJECTED" => Ok(AccessStatus::Rejected),
        "REVOKED" => Ok(AccessStatus::Revoked),
        other => Err(AppError::Validation(format!("Unknown status: {other}"))),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
    pub target_type: String,
    pub target_id: i64,
    pub request_type: Option<String>,
    pub access_level: Option<String>,
    pub justification: Option<String>,
    pub duration_minutes: Option<i64>,
}

/// Submit an access request on the caller's own behalf.
pub async fn create_request(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<CreateRequestBody>,
) -> Result<(StatusCode, Json<AccessRequest>)> {
    let request = state
        .access
        .create_request(
            actor.user_id,
            NewAccessRequest {
                target_type: body.target_type,
                target_id: body.target_id,
                request_type: body.request_type,
                access_level: body.access_level,
                justification: body.justification,
                duration_minutes: body.duration_minutes,
            },
        )
        .await?;

    state
        .audit
        .record(
            AuditEntry::new("access.request")
                .actor(actor.user_id)
                .target(request.target_type.clone(), request.target_id)
                .new_value(request.status.as_str())
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok((StatusCode::CREATED, Json(request)))
}

#[derive(Debug, Deserialize)]
pub struct ListRequestsQuery {
    pub status: Option<String>,
    pub user_id: Option<i64>,
    pub target_type: Option<String>,
}

pub async fn list_requests(
    State(state): State<SharedState>,
    Query(query): Query<ListRequestsQuery>,
) -> Result<Json<Vec<AccessRequestDetail>>> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    let requests = state
        .access
        .list(&AccessRequestFilter {
            status,
            user_id: query.user_id,
            target_type: query.target_type,
        })
        .await?;
    Ok(Json(requests))
}

/// The approval queue, oldest first.
pub async fn pending_requests(
    State(state): State<SharedState>,
) -> Result<Json<Vec<AccessRequestDetail>>> {
    Ok(Json(state.access.pending().await?))
}

/// The caller's own request history.
pub async fn my_requests(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<AccessRequestDetail>>> {
    Ok(Json(state.access.for_user(actor.user_id).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct ApproveRequestBody {
    pub duration_minutes: Option<i64>,
}

/// Approve a pending request. Requires a role with the approve capability;
/// approving an already-decided request affects zero rows. The body is
/// optional and may bound the grant with a duration of the approver's
/// choosing.
pub async fn approve_request(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    body: Option<Json<ApproveRequestBody>>,
) -> Result<Json<MutationResponse>> {
    if !state.permissions.can_approve_requests(actor.user_id).await? {
        return Err(AppError::Authorization(
            "Your roles cannot approve access requests".to_string(),
        ));
    }

    let duration = body.and_then(|Json(body)| body.duration_minutes);
    let affected = state.access.approve(id, actor.user_id, duration).await?;

    state
        .audit
        .record(
            AuditEntry::new("access.approve")
                .actor(actor.user_id)
                .target("access_request", id)
                .new_value(AccessStatus::Approved.as_str())
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok(Json(MutationResponse { affected }))
}

#[derive(Debug, Deserialize)]
pub struct RejectRequestBody {
    pub reason: String,
}

/// Reject a pending request with a mandatory reason.
pub async fn reject_request(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(body): Json<RejectRequestBody>,
) -> Result<Json<MutationResponse>> {
    if !state.permissions.can_approve_requests(actor.user_id).await? {
        return Err(AppError::Authorization(
            "Your roles cannot reject access requests".to_string(),
        ));
    }

    let affected = state.access.reject(id, actor.user_id, &body.reason).await?;

    state
        .audit
        .record(
            AuditEntry::new("access.reject")
                .actor(actor.user_id)
                .target("access_request", id)
                .new_value(AccessStatus::Rejected.as_str())
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok(Json(MutationResponse { affected }))
}

#[derive(Debug, Deserialize)]
pub struct GrantBody {
    pub user_id: i64,
    pub target_type: String,
    pub target_id: i64,
    pub access_level: Option<String>,
    pub justification: Option<String>,
    pub duration_minutes: Option<i64>,
}

/// Grant access directly, skipping the pending state. Requires a role with
/// the grant capability.
pub async fn grant_access(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<GrantBody>,
) -> Result<(StatusCode, Json<AccessRequest>)> {
    if !state.permissions.can_grant_access(actor.user_id).await? {
        return Err(AppError::Authorization(
            "Your roles cannot grant access directly".to_string(),
        ));
    }

    let grant = state
        .access
        .direct_grant(
            actor.user_id,
            DirectGrant {
                user_id: body.user_id,
                target_type: body.target_type,
                target_id: body.target_id,
                access_level: body.access_level,
                justification: body.justification,
                duration_minutes: body.duration_minutes,
            },
        )
        .await?;

    state
        .audit
        .record(
            AuditEntry::new("access.grant")
                .actor(actor.user_id)
                .target(grant.target_type.clone(), grant.target_id)
                .new_value(AccessStatus::Approved.as_str())
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok((StatusCode::CREATED, Json(grant)))
}

#[derive(Debug, Deserialize)]
pub struct RevokeBody {
    pub user_id: i64,
    pub target_type: String,
    pub target_id: i64,
}

/// Revoke every approved grant a user holds on a target. Revoking nothing
/// is a success with `affected: 0`.
pub async fn revoke_access(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<RevokeBody>,
) -> Result<Json<MutationResponse>> {
    if !state.permissions.can_grant_access(actor.user_id).await? {
        return Err(AppError::Authorization(
            "Your roles cannot revoke access".to_string(),
        ));
    }

    let affected = state
        .access
        .revoke(body.user_id, &body.target_type, body.target_id)
        .await?;

    state
        .audit
        .record(
            AuditEntry::new("access.revoke")
                .actor(actor.user_id)
                .target(body.target_type, body.target_id)
                .new_value(AccessStatus::Revoked.as_str())
                .client(actor.ip_address, actor.user_agent),
        )
        .await;

    Ok(Json(MutationResponse { affected }))
}

#[derive(Debug, Serialize)]
pub struct AccessCheckResponse {
    pub has_access: bool,
}

/// Whether the caller currently holds unexpired approved access to a target.
pub async fn check_access(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Path((target_type, target_id)): Path<(String, i64)>,
) -> Result<Json<AccessCheckResponse>> {
    let has_access = state
        .access
        .has_valid_access(actor.user_id, &target_type, target_id)
        .await?;
    Ok(Json(AccessCheckResponse { has_access }))
}
