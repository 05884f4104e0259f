//! Permission resolution: the union of role grants and group grants.

use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::permission::Permission;

/// Resolves a user's effective permissions from both grant paths.
///
/// A user holds a permission if any of their roles grants it or any of
/// their groups grants it. Resolution always reads live rows, so revoking
/// a role or group membership takes effect on the next check.
#[derive(Clone)]
pub struct PermissionService {
    db: SqlitePool,
}

impl PermissionService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Check whether the user holds the named permission via either path.
    pub async fn has_permission(&self, user_id: i64, permission: &str) -> Result<bool> {
        let held = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM user_roles ur
                JOIN role_permissions rp ON rp.role_id = ur.role_id
                JOIN permissions p ON p.id = rp.permission_id
                WHERE ur.user_id = ?1 AND p.name = ?2
                UNION
                SELECT 1 FROM user_group_members ugm
                JOIN group_permissions gp ON gp.group_id = ugm.group_id
                JOIN permissions p ON p.id = gp.permission_id
                WHERE ugm.user_id = ?1 AND p.name = ?2
            )
            "#,
        )
        .bind(user_id)
        .bind(permission)
        .fetch_one(&self.db)
        .await?;
        Ok(held)
    }

    /// All distinct permissions the user holds, from roles and groups combined.
    pub async fn effective_permissions(&self, user_id: i64) -> Result<Vec<Permission>> {
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT * FROM permissions WHERE id IN (
                SELECT rp.permission_id FROM user_roles ur
                JOIN role_permissions rp ON rp.role_id = ur.role_id
                WHERE ur.user_id = ?1
                UNION
                SELECT gp.permission_id FROM user_group_members ugm
                JOIN group_permissions gp ON gp.group_id = ugm.group_id
                WHERE ugm.user_id = ?1
            )
            ORDER BY category, name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(permissions)
    }

    /// Names of the user's roles, highest hierarchy first.
    pub async fn role_names(&self, user_id: i64) -> Result<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(
            r#"
            SELECT r.name FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = ?
            ORDER BY r.hierarchy_level DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(names)
    }

    /// Check whether the user holds at least one of the named roles.
    pub async fn has_any_role(&self, user_id: i64, roles: &[&str]) -> Result<bool> {
        if roles.is_empty() {
            return Ok(false);
        }
        let placeholders = vec!["?"; roles.len()].join(", ");
        let sql = format!(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM user_roles ur
                JOIN roles r ON r.id = ur.role_id
                WHERE ur.user_id = ? AND r.name IN ({placeholders})
            )
            "#
        );
        let mut query = sqlx::query_scalar::<_, bool>(&sql).bind(user_id);
        for role in roles {
            query = query.bind(*role);
        }
        let held = query.fetch_one(&self.db).await?;
        Ok(held)
    }

    /// The user's highest role hierarchy level; 0 when they have no roles.
    pub async fn max_hierarchy_level(&self, user_id: i64) -> Result<i64> {
        let level = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(MAX(r.hierarchy_level), 0) FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;
        Ok(level)
    }

    pub async fn meets_hierarchy(&self, user_id: i64, min_level: i64) -> Result<bool> {
        Ok(self.max_hierarchy_level(user_id).await? >= min_level)
    }

    /// True when any of the user's roles carries the grant capability flag.
    pub async fn can_grant_access(&self, user_id: i64) -> Result<bool> {
        self.role_flag(user_id, "can_grant_access").await
    }

    /// True when any of the user's roles carries the approve capability flag.
    pub async fn can_approve_requests(&self, user_id: i64) -> Result<bool> {
        self.role_flag(user_id, "can_approve_requests").await
    }

    async fn role_flag(&self, user_id: i64, flag: &str) -> Result<bool> {
        // flag is one of two compile-time column names, never user input.
        let sql = format!(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM roles r
                JOIN user_roles ur ON ur.role_id = r.id
                WHERE ur.user_id = ? AND r.{flag} = 1
            )
            "#
        );
        let held = sqlx::query_scalar::<_, bool>(&sql)
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;
        Ok(held)
    }
}
