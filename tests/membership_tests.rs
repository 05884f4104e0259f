//! Bulk membership mutations and permission set replacement.

mod common;

use toolgate::error::AppError;
use toolgate::services::{AccessService, MembershipService, PermissionService};

use common::*;

#[tokio::test]
async fn bulk_role_assignment_counts_new_links_only() {
    let pool = test_pool().await;
    let service = MembershipService::new(pool.clone());
    let admin = create_user(&pool, "admin@example.com").await;

    let users = [
        create_user(&pool, "a@example.com").await,
        create_user(&pool, "b@example.com").await,
        create_user(&pool, "c@example.com").await,
    ];
    let roles = [role_id(&pool, "user").await, role_id(&pool, "manager").await];

    // One of the six pairs already exists.
    assign_role(&pool, users[0], "user").await;

    let affected = service
        .bulk_assign_roles(admin, &users, &roles)
        .await
        .unwrap();
    assert_eq!(affected, 5);

    // Re-running assigns nothing new.
    let affected = service
        .bulk_assign_roles(admin, &users, &roles)
        .await
        .unwrap();
    assert_eq!(affected, 0);
}

#[tokio::test]
async fn bulk_role_removal_reports_deleted_links() {
    let pool = test_pool().await;
    let service = MembershipService::new(pool.clone());
    let admin = create_user(&pool, "admin@example.com").await;

    let users = [
        create_user(&pool, "a@example.com").await,
        create_user(&pool, "b@example.com").await,
    ];
    let roles = [role_id(&pool, "user").await];
    service.bulk_assign_roles(admin, &users, &roles).await.unwrap();

    assert_eq!(service.bulk_remove_roles(&users, &roles).await.unwrap(), 2);
    assert_eq!(service.bulk_remove_roles(&users, &roles).await.unwrap(), 0);
}

#[tokio::test]
async fn bulk_operations_reject_empty_input() {
    let pool = test_pool().await;
    let service = MembershipService::new(pool.clone());
    let admin = create_user(&pool, "admin@example.com").await;
    let user = create_user(&pool, "a@example.com").await;

    let err = service.bulk_assign_roles(admin, &[], &[1]).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    let err = service.bulk_assign_roles(admin, &[user], &[]).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    let err = service.bulk_add_to_groups(admin, &[], &[]).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn group_membership_bulk_add_skips_existing() {
    let pool = test_pool().await;
    let service = MembershipService::new(pool.clone());
    let admin = create_user(&pool, "admin@example.com").await;

    let users = [
        create_user(&pool, "a@example.com").await,
        create_user(&pool, "b@example.com").await,
    ];
    let groups = [
        create_group(&pool, "platform").await,
        create_group(&pool, "auditors").await,
    ];
    add_group_member(&pool, groups[0], users[0]).await;

    let affected = service
        .bulk_add_to_groups(admin, &users, &groups)
        .await
        .unwrap();
    assert_eq!(affected, 3);
}

#[tokio::test]
async fn role_permission_replacement_is_total() {
    let pool = test_pool().await;
    let memberships = MembershipService::new(pool.clone());
    let permissions = PermissionService::new(pool.clone());

    let user = create_user(&pool, "a@example.com").await;
    let manager = role_id(&pool, "manager").await;
    assign_role(&pool, user, "manager").await;
    assert!(permissions.has_permission(user, "access.approve").await.unwrap());

    let audit_read: i64 = sqlx::query_scalar("SELECT id FROM permissions WHERE name = 'audit.read'")
        .fetch_one(&pool)
        .await
        .unwrap();
    memberships
        .set_role_permissions(manager, &[audit_read])
        .await
        .unwrap();

    assert!(permissions.has_permission(user, "audit.read").await.unwrap());
    assert!(!permissions.has_permission(user, "access.approve").await.unwrap());

    // Replacing with an empty list clears the set entirely.
    memberships.set_role_permissions(manager, &[]).await.unwrap();
    assert!(permissions.effective_permissions(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn group_permission_bulk_assignment() {
    let pool = test_pool().await;
    let memberships = MembershipService::new(pool.clone());
    let permissions = PermissionService::new(pool.clone());

    let user = create_user(&pool, "a@example.com").await;
    let groups = [
        create_group(&pool, "platform").await,
        create_group(&pool, "auditors").await,
    ];
    add_group_member(&pool, groups[1], user).await;

    let perm_ids: Vec<i64> = sqlx::query_scalar(
        "SELECT id FROM permissions WHERE name IN ('audit.read', 'audit.export')",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    let affected = memberships
        .bulk_assign_group_permissions(&groups, &perm_ids)
        .await
        .unwrap();
    assert_eq!(affected, 4);

    assert!(permissions.has_permission(user, "audit.export").await.unwrap());
}

#[tokio::test]
async fn bulk_tool_grant_skips_already_approved_pairs() {
    let pool = test_pool().await;
    let access = AccessService::new(pool.clone());
    let admin = create_user(&pool, "admin@example.com").await;

    let users = [
        create_user(&pool, "a@example.com").await,
        create_user(&pool, "b@example.com").await,
    ];
    let tools = [
        create_tool(&pool, "grafana").await,
        create_tool(&pool, "vault").await,
    ];

    // One pair already holds an approved grant.
    access
        .bulk_grant(admin, &users[..1], &tools[..1], None, None)
        .await
        .unwrap();

    let granted = access
        .bulk_grant(admin, &users, &tools, Some("read"), Some(120))
        .await
        .unwrap();
    assert_eq!(granted, 3);

    for user in users {
        for tool in tools {
            assert!(access.has_valid_access(user, "tool", tool).await.unwrap());
        }
    }
}

#[tokio::test]
async fn single_member_add_and_remove() {
    let pool = test_pool().await;
    let service = MembershipService::new(pool.clone());
    let admin = create_user(&pool, "admin@example.com").await;
    let user = create_user(&pool, "a@example.com").await;
    let group = create_group(&pool, "platform").await;

    assert_eq!(
        service.add_group_members(admin, group, &[user]).await.unwrap(),
        1
    );
    assert_eq!(
        service.add_group_members(admin, group, &[user]).await.unwrap(),
        0
    );
    assert_eq!(service.remove_group_member(group, user).await.unwrap(), 1);
    assert_eq!(service.remove_group_member(group, user).await.unwrap(), 0);
}
