//! Access request lifecycle transitions and validity checks.

mod common;

use chrono::{Duration, Utc};
use toolgate::error::AppError;
use toolgate::models::access_request::AccessStatus;
use toolgate::services::access_service::{AccessRequestFilter, DirectGrant, NewAccessRequest};
use toolgate::services::AccessService;

use common::*;

fn tool_request(tool_id: i64) -> NewAccessRequest {
    NewAccessRequest {
        target_type: "tool".to_string(),
        target_id: tool_id,
        request_type: None,
        access_level: None,
        justification: Some("need it for the migration".to_string()),
        duration_minutes: None,
    }
}

#[tokio::test]
async fn new_request_defaults_to_pending_read() {
    let pool = test_pool().await;
    let service = AccessService::new(pool.clone());
    let user = create_user(&pool, "req@example.com").await;
    let tool = create_tool(&pool, "grafana").await;

    let request = service.create_request(user, tool_request(tool)).await.unwrap();

    assert_eq!(request.status, AccessStatus::Pending);
    assert_eq!(request.access_level, "read");
    assert_eq!(request.request_type, "tool_access");
    assert!(request.approved_by.is_none());
    assert!(request.expires_at.is_none());
}

#[tokio::test]
async fn missing_tool_target_is_rejected() {
    let pool = test_pool().await;
    let service = AccessService::new(pool.clone());
    let user = create_user(&pool, "req@example.com").await;

    let err = service.create_request(user, tool_request(9999)).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn zero_target_id_is_rejected() {
    let pool = test_pool().await;
    let service = AccessService::new(pool.clone());
    let user = create_user(&pool, "req@example.com").await;

    // Non-tool targets skip the existence lookup but still need a real id.
    let err = service
        .create_request(
            user,
            NewAccessRequest {
                target_type: "project".to_string(),
                target_id: 0,
                request_type: None,
                access_level: None,
                justification: None,
                duration_minutes: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn direct_grant_requires_a_user_and_target() {
    let pool = test_pool().await;
    let service = AccessService::new(pool.clone());
    let granter = create_user(&pool, "boss@example.com").await;
    let user = create_user(&pool, "req@example.com").await;
    let tool = create_tool(&pool, "grafana").await;

    let grants = [
        DirectGrant {
            user_id: 0,
            target_type: "tool".to_string(),
            target_id: tool,
            access_level: None,
            justification: None,
            duration_minutes: None,
        },
        DirectGrant {
            user_id: user,
            target_type: "tool".to_string(),
            target_id: 0,
            access_level: None,
            justification: None,
            duration_minutes: None,
        },
    ];
    for grant in grants {
        let err = service.direct_grant(granter, grant).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}

#[tokio::test]
async fn duplicate_pending_request_conflicts() {
    let pool = test_pool().await;
    let service = AccessService::new(pool.clone());
    let user = create_user(&pool, "req@example.com").await;
    let approver = create_user(&pool, "boss@example.com").await;
    let tool = create_tool(&pool, "grafana").await;

    let first = service.create_request(user, tool_request(tool)).await.unwrap();
    let err = service.create_request(user, tool_request(tool)).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // Once the pending request is decided, a new one is allowed again.
    service.reject(first.id, approver, "not now").await.unwrap();
    service.create_request(user, tool_request(tool)).await.unwrap();
}

#[tokio::test]
async fn approve_is_single_shot() {
    let pool = test_pool().await;
    let service = AccessService::new(pool.clone());
    let user = create_user(&pool, "req@example.com").await;
    let approver = create_user(&pool, "boss@example.com").await;
    let rival = create_user(&pool, "rival@example.com").await;
    let tool = create_tool(&pool, "grafana").await;

    let request = service.create_request(user, tool_request(tool)).await.unwrap();

    assert_eq!(service.approve(request.id, approver, None).await.unwrap(), 1);
    // The second decision affects zero rows and changes nothing.
    assert_eq!(service.approve(request.id, rival, None).await.unwrap(), 0);
    assert_eq!(service.reject(request.id, rival, "too late").await.unwrap(), 0);

    let decided = service.get(request.id).await.unwrap();
    assert_eq!(decided.status, AccessStatus::Approved);
    assert_eq!(decided.approved_by, Some(approver));
    assert!(decided.rejected_by.is_none());
}

#[tokio::test]
async fn reject_requires_a_reason() {
    let pool = test_pool().await;
    let service = AccessService::new(pool.clone());
    let user = create_user(&pool, "req@example.com").await;
    let approver = create_user(&pool, "boss@example.com").await;
    let tool = create_tool(&pool, "grafana").await;

    let request = service.create_request(user, tool_request(tool)).await.unwrap();

    let err = service.reject(request.id, approver, "   ").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    assert_eq!(service.reject(request.id, approver, "no").await.unwrap(), 1);
    let rejected = service.get(request.id).await.unwrap();
    assert_eq!(rejected.status, AccessStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("no"));
}

#[tokio::test]
async fn decision_on_unknown_request_is_not_found() {
    let pool = test_pool().await;
    let service = AccessService::new(pool.clone());
    let approver = create_user(&pool, "boss@example.com").await;

    let err = service.approve(404, approver, None).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn direct_grant_is_born_approved() {
    let pool = test_pool().await;
    let service = AccessService::new(pool.clone());
    let user = create_user(&pool, "req@example.com").await;
    let granter = create_user(&pool, "boss@example.com").await;
    let tool = create_tool(&pool, "grafana").await;

    let grant = service
        .direct_grant(
            granter,
            DirectGrant {
                user_id: user,
                target_type: "tool".to_string(),
                target_id: tool,
                access_level: Some("write".to_string()),
                justification: None,
                duration_minutes: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(grant.status, AccessStatus::Approved);
    assert_eq!(grant.approved_by, Some(granter));
    assert!(grant.approved_at.is_some());
    assert_eq!(grant.access_level, "write");
    assert!(service.has_valid_access(user, "tool", tool).await.unwrap());
}

#[tokio::test]
async fn non_positive_duration_means_permanent() {
    let pool = test_pool().await;
    let service = AccessService::new(pool.clone());
    let user = create_user(&pool, "req@example.com").await;
    let admin = create_user(&pool, "boss@example.com").await;
    let tool = create_tool(&pool, "grafana").await;

    let grant = service
        .direct_grant(
            admin,
            DirectGrant {
                user_id: user,
                target_type: "tool".to_string(),
                target_id: tool,
                access_level: None,
                justification: None,
                duration_minutes: Some(0),
            },
        )
        .await
        .unwrap();
    assert!(grant.expires_at.is_none());
    assert!(service.has_valid_access(user, "tool", tool).await.unwrap());

    // The same rule applies to the requested duration at approval time.
    let other = create_tool(&pool, "vault").await;
    let mut request = tool_request(other);
    request.duration_minutes = Some(-5);
    let pending = service.create_request(user, request).await.unwrap();
    service.approve(pending.id, admin, None).await.unwrap();

    let approved = service.get(pending.id).await.unwrap();
    assert!(approved.expires_at.is_none());
}

#[tokio::test]
async fn approver_can_bound_the_grant_duration() {
    let pool = test_pool().await;
    let service = AccessService::new(pool.clone());
    let user = create_user(&pool, "req@example.com").await;
    let admin = create_user(&pool, "boss@example.com").await;
    let tool = create_tool(&pool, "grafana").await;

    // The request asked for permanent access; the approver limits it.
    let request = service.create_request(user, tool_request(tool)).await.unwrap();
    assert!(request.duration_minutes.is_none());
    service.approve(request.id, admin, Some(30)).await.unwrap();

    let approved = service.get(request.id).await.unwrap();
    let expires_at = approved.expires_at.unwrap();
    assert!(expires_at > Utc::now());
    assert!(expires_at <= Utc::now() + Duration::minutes(30));
    assert!(service.has_valid_access(user, "tool", tool).await.unwrap());
}

#[tokio::test]
async fn revoke_covers_every_approved_grant() {
    let pool = test_pool().await;
    let service = AccessService::new(pool.clone());
    let user = create_user(&pool, "req@example.com").await;
    let admin = create_user(&pool, "boss@example.com").await;
    let tool = create_tool(&pool, "grafana").await;

    // Two approved rows on the same target: one via the workflow, one direct.
    let request = service.create_request(user, tool_request(tool)).await.unwrap();
    service.approve(request.id, admin, None).await.unwrap();
    service
        .direct_grant(
            admin,
            DirectGrant {
                user_id: user,
                target_type: "tool".to_string(),
                target_id: tool,
                access_level: Some("write".to_string()),
                justification: None,
                duration_minutes: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(service.revoke(user, "tool", tool).await.unwrap(), 2);
    assert!(!service.has_valid_access(user, "tool", tool).await.unwrap());

    // Revoking again is a benign no-op.
    assert_eq!(service.revoke(user, "tool", tool).await.unwrap(), 0);
}

#[tokio::test]
async fn expiry_is_advisory_and_checked_at_read_time() {
    let pool = test_pool().await;
    let service = AccessService::new(pool.clone());
    let user = create_user(&pool, "req@example.com").await;
    let admin = create_user(&pool, "boss@example.com").await;
    let tool = create_tool(&pool, "grafana").await;

    let grant = service
        .direct_grant(
            admin,
            DirectGrant {
                user_id: user,
                target_type: "tool".to_string(),
                target_id: tool,
                access_level: None,
                justification: None,
                duration_minutes: Some(60),
            },
        )
        .await
        .unwrap();
    assert!(grant.expires_at.is_some());
    assert!(service.has_valid_access(user, "tool", tool).await.unwrap());

    // Push the deadline into the past; the stored status must stay APPROVED
    // while validity flips.
    sqlx::query("UPDATE access_requests SET expires_at = ? WHERE id = ?")
        .bind(Utc::now() - Duration::minutes(30))
        .bind(grant.id)
        .execute(&pool)
        .await
        .unwrap();

    assert!(!service.has_valid_access(user, "tool", tool).await.unwrap());
    let row = service.get(grant.id).await.unwrap();
    assert_eq!(row.status, AccessStatus::Approved);
}

#[tokio::test]
async fn listings_filter_and_order() {
    let pool = test_pool().await;
    let service = AccessService::new(pool.clone());
    let alice = create_user(&pool, "alice@example.com").await;
    let bob = create_user(&pool, "bob@example.com").await;
    let approver = create_user(&pool, "boss@example.com").await;
    let tool_a = create_tool(&pool, "grafana").await;
    let tool_b = create_tool(&pool, "vault").await;

    let first = service.create_request(alice, tool_request(tool_a)).await.unwrap();
    service.create_request(alice, tool_request(tool_b)).await.unwrap();
    service.create_request(bob, tool_request(tool_a)).await.unwrap();
    service.approve(first.id, approver, None).await.unwrap();

    let pending = service.pending().await.unwrap();
    assert_eq!(pending.len(), 2);
    // Oldest first in the approval queue.
    assert!(pending[0].id < pending[1].id);
    assert_eq!(pending[0].target_name.as_deref(), Some("vault"));

    let approved = service
        .list(&AccessRequestFilter {
            status: Some(AccessStatus::Approved),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(approved.len(), 1);
    assert_eq!(approved[0].user_email, "alice@example.com");

    let mine = service.for_user(alice).await.unwrap();
    assert_eq!(mine.len(), 2);
}
