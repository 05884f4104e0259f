//! Database connection pool setup, schema application, and default seeding.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::error::Result;

/// Embedded relational schema, applied idempotently at startup.
const SCHEMA: &str = include_str!("schema.sql");

/// Create a new database connection pool
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Apply the embedded schema.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}

/// Seed system roles, the permission catalog, and default role grants.
///
/// All inserts are insert-or-ignore, so calling this on every boot is safe
/// and never clobbers operator edits to non-protected rows.
pub async fn seed_defaults(pool: &SqlitePool) -> Result<()> {
    // (name, display_name, description, hierarchy, can_grant, can_approve)
    let system_roles: [(&str, &str, &str, i64, bool, bool); 4] = [
        (
            "super_admin",
            "Super Admin",
            "Full system access with all privileges",
            100,
            true,
            true,
        ),
        (
            "admin",
            "Administrator",
            "Administrative access to manage users and resources",
            80,
            true,
            true,
        ),
        (
            "manager",
            "Manager",
            "Can approve access requests and view reports",
            50,
            false,
            true,
        ),
        ("user", "User", "Standard user with basic access", 10, false, false),
    ];

    for (name, display_name, description, level, can_grant, can_approve) in system_roles {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO roles
                (name, display_name, description, hierarchy_level,
                 can_grant_access, can_approve_requests, is_system_role)
            VALUES (?, ?, ?, ?, ?, ?, 1)
            "#,
        )
        .bind(name)
        .bind(display_name)
        .bind(description)
        .bind(level)
        .bind(can_grant)
        .bind(can_approve)
        .execute(pool)
        .await?;
    }

    // (name, display_name, description, category)
    let permissions: [(&str, &str, &str, &str); 26] = [
        ("users.create", "Create Users", "Create new user accounts", "users"),
        ("users.read", "View Users", "View user information", "users"),
        ("users.update", "Update Users", "Modify user accounts", "users"),
        ("users.delete", "Delete Users", "Remove user accounts", "users"),
        ("roles.create", "Create Roles", "Create new roles", "roles"),
        ("roles.read", "View Roles", "View role information", "roles"),
        ("roles.update", "Update Roles", "Modify roles", "roles"),
        ("roles.delete", "Delete Roles", "Remove roles", "roles"),
        ("roles.assign", "Assign Roles", "Assign roles to users", "roles"),
        ("groups.create", "Create Groups", "Create user groups", "groups"),
        ("groups.read", "View Groups", "View group information", "groups"),
        ("groups.update", "Update Groups", "Modify groups", "groups"),
        ("groups.delete", "Delete Groups", "Remove groups", "groups"),
        (
            "groups.manage_members",
            "Manage Group Members",
            "Add/remove group members",
            "groups",
        ),
        ("tools.create", "Create Tools", "Add new tools/resources", "tools"),
        ("tools.read", "View Tools", "View tools information", "tools"),
        ("tools.update", "Update Tools", "Modify tools", "tools"),
        ("tools.delete", "Delete Tools", "Remove tools", "tools"),
        (
            "tools.manage_access",
            "Manage Tool Access",
            "Manage access to tools",
            "tools",
        ),
        ("access.request", "Request Access", "Request access to resources", "access"),
        ("access.approve", "Approve Access", "Approve access requests", "access"),
        ("access.reject", "Reject Access", "Reject access requests", "access"),
        ("access.grant", "Grant Access", "Directly grant access", "access"),
        ("access.revoke", "Revoke Access", "Revoke existing access", "access"),
        ("audit.read", "View Audit Logs", "View audit logs", "audit"),
        ("audit.export", "Export Audit Logs", "Export audit log data", "audit"),
    ];

    for (name, display_name, description, category) in permissions {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO permissions (name, display_name, description, category)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(name)
        .bind(display_name)
        .bind(description)
        .bind(category)
        .execute(pool)
        .await?;
    }

    // super_admin gets everything.
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO role_permissions (role_id, permission_id)
        SELECT r.id, p.id FROM roles r, permissions p WHERE r.name = 'super_admin'
        "#,
    )
    .execute(pool)
    .await?;

    // admin gets everything except role deletion and audit export.
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO role_permissions (role_id, permission_id)
        SELECT r.id, p.id FROM roles r, permissions p
        WHERE r.name = 'admin' AND p.name NOT IN ('roles.delete', 'audit.export')
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT OR IGNORE INTO role_permissions (role_id, permission_id)
        SELECT r.id, p.id FROM roles r, permissions p
        WHERE r.name = 'manager' AND p.name IN
            ('users.read', 'roles.read', 'groups.read', 'tools.read',
             'access.approve', 'access.reject', 'audit.read')
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT OR IGNORE INTO role_permissions (role_id, permission_id)
        SELECT r.id, p.id FROM roles r, permissions p
        WHERE r.name = 'user' AND p.name IN ('users.read', 'tools.read', 'access.request')
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize the database: apply schema and seed defaults.
pub async fn init(pool: &SqlitePool) -> Result<()> {
    apply_schema(pool).await?;
    seed_defaults(pool).await?;
    Ok(())
}
