//! End-to-end HTTP tests: authentication, guards, and the access workflow.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use toolgate::api::routes;

use common::*;

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, value)
}

#[tokio::test]
async fn health_is_public() {
    let state = test_state().await;
    let app = routes::router(state);

    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let state = test_state().await;
    let app = routes::router(state);

    let (status, _) = send(&app, "GET", "/api/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/auth/me", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn setup_then_login_flow() {
    let state = test_state().await;
    let app = routes::router(state.clone());

    let (status, body) = send(&app, "GET", "/api/check-setup", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["setup_required"], true);

    // Short passwords are rejected before any account is created.
    let (status, _) = send(
        &app,
        "POST",
        "/api/setup",
        None,
        Some(json!({"email": "root@example.com", "password": "short"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/api/setup",
        None,
        Some(json!({"email": "root@example.com", "password": "correct-horse"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    // Setup is one-shot.
    let (status, _) = send(
        &app,
        "POST",
        "/api/setup",
        None,
        Some(json!({"email": "other@example.com", "password": "correct-horse"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "GET", "/api/check-setup", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["setup_required"], false);

    // The setup token authenticates as a super admin.
    let (status, body) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "root@example.com");
    assert_eq!(body["roles"][0], "super_admin");
    assert!(!body["permissions"].as_array().unwrap().is_empty());

    // Password login issues a fresh token and the session cookie.
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "root@example.com", "password": "correct-horse"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().is_some());

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "root@example.com", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_cookie_authenticates() {
    let state = test_state().await;
    let app = routes::router(state.clone());

    let user = create_user(&state.db, "dev@example.com").await;
    assign_role(&state.db, user, "user").await;
    let token = token_for(&state, user).await;

    let request = Request::builder()
        .method("GET")
        .uri("/api/auth/me")
        .header(header::COOKIE, format!("theme=dark; auth_token={token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn guards_enforce_permissions_and_roles() {
    let state = test_state().await;
    let app = routes::router(state.clone());

    let user = create_user(&state.db, "dev@example.com").await;
    assign_role(&state.db, user, "user").await;
    let token = token_for(&state, user).await;

    // The seeded user role can read users and tools.
    let (status, _) = send(&app, "GET", "/api/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    // But not delete roles, view the audit trail, or touch bulk endpoints.
    let (status, _) = send(&app, "DELETE", "/api/roles/1", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "GET", "/api/audit", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(
        &app,
        "POST",
        "/api/bulk/user-roles",
        Some(&token),
        Some(json!({"user_ids": [user], "role_ids": [1]})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The ladder view needs manager standing.
    let (status, _) = send(&app, "GET", "/api/roles/hierarchy", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let manager = create_user(&state.db, "mgr@example.com").await;
    assign_role(&state.db, manager, "manager").await;
    let manager_token = token_for(&state, manager).await;
    let (status, _) = send(&app, "GET", "/api/roles/hierarchy", Some(&manager_token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn system_roles_are_immutable_over_http() {
    let state = test_state().await;
    let app = routes::router(state.clone());

    let admin = create_user(&state.db, "root@example.com").await;
    assign_role(&state.db, admin, "super_admin").await;
    let token = token_for(&state, admin).await;

    let role = role_id(&state.db, "user").await;
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/roles/{role}"),
        Some(&token),
        Some(json!({"display_name": "Renamed"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "DELETE", &format!("/api/roles/{role}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Custom roles can still be managed.
    let (status, body) = send(
        &app,
        "POST",
        "/api/roles",
        Some(&token),
        Some(json!({"name": "oncall", "display_name": "On-call"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let custom = body["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/roles/{custom}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn access_workflow_over_http() {
    let state = test_state().await;
    let app = routes::router(state.clone());

    let dev = create_user(&state.db, "dev@example.com").await;
    assign_role(&state.db, dev, "user").await;
    let dev_token = token_for(&state, dev).await;

    let manager = create_user(&state.db, "mgr@example.com").await;
    assign_role(&state.db, manager, "manager").await;
    let manager_token = token_for(&state, manager).await;

    let tool = create_tool(&state.db, "grafana").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/access/requests",
        Some(&dev_token),
        Some(json!({"target_type": "tool", "target_id": tool})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "PENDING");
    let request_id = body["id"].as_i64().unwrap();

    // Duplicate while pending conflicts.
    let (status, _) = send(
        &app,
        "POST",
        "/api/access/requests",
        Some(&dev_token),
        Some(json!({"target_type": "tool", "target_id": tool})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The requester cannot decide; the manager can.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/access/requests/{request_id}/approve"),
        Some(&dev_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The approver bounds the grant at decision time.
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/access/requests/{request_id}/approve"),
        Some(&manager_token),
        Some(json!({"duration_minutes": 120})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["affected"], 1);

    // Approving again is a reported no-op.
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/access/requests/{request_id}/approve"),
        Some(&manager_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["affected"], 0);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/access/check/tool/{tool}"),
        Some(&dev_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["has_access"], true);

    // Managers cannot revoke (no grant capability); an admin can.
    let (status, _) = send(
        &app,
        "POST",
        "/api/access/revoke",
        Some(&manager_token),
        Some(json!({"user_id": dev, "target_type": "tool", "target_id": tool})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = create_user(&state.db, "admin@example.com").await;
    assign_role(&state.db, admin, "admin").await;
    let admin_token = token_for(&state, admin).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/access/revoke",
        Some(&admin_token),
        Some(json!({"user_id": dev, "target_type": "tool", "target_id": tool})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["affected"], 1);

    // The workflow left a trail the admin can read.
    let (status, body) = send(
        &app,
        "GET",
        "/api/audit?category=access",
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["total"].as_i64().unwrap() >= 3);
}
