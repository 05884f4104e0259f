//! Role assignment, group membership, and permission link mutations.

use sqlx::SqlitePool;

use crate::error::{AppError, Result};

/// Mutates the join tables linking users, roles, groups, and permissions.
///
/// Bulk operations run in one transaction and report how many links were
/// actually created or removed; pairs that already exist are skipped, not
/// errors.
#[derive(Clone)]
pub struct MembershipService {
    db: SqlitePool,
}

impl MembershipService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn assign_role(&self, actor_id: i64, user_id: i64, role_id: i64) -> Result<u64> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO user_roles (user_id, role_id, granted_by) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(role_id)
        .bind(actor_id)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn remove_role(&self, user_id: i64, role_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = ? AND role_id = ?")
            .bind(user_id)
            .bind(role_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }

    /// Assign every role in `role_ids` to every user in `user_ids`.
    pub async fn bulk_assign_roles(
        &self,
        actor_id: i64,
        user_ids: &[i64],
        role_ids: &[i64],
    ) -> Result<u64> {
        if user_ids.is_empty() || role_ids.is_empty() {
            return Err(AppError::Validation(
                "user_ids and role_ids must be non-empty".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;
        let mut affected = 0;
        for user_id in user_ids {
            for role_id in role_ids {
                let result = sqlx::query(
                    "INSERT OR IGNORE INTO user_roles (user_id, role_id, granted_by) VALUES (?, ?, ?)",
                )
                .bind(user_id)
                .bind(role_id)
                .bind(actor_id)
                .execute(&mut *tx)
                .await?;
                affected += result.rows_affected();
            }
        }
        tx.commit().await?;
        Ok(affected)
    }

    pub async fn bulk_remove_roles(&self, user_ids: &[i64], role_ids: &[i64]) -> Result<u64> {
        if user_ids.is_empty() || role_ids.is_empty() {
            return Err(AppError::Validation(
                "user_ids and role_ids must be non-empty".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;
        let mut affected = 0;
        for user_id in user_ids {
            for role_id in role_ids {
                let result =
                    sqlx::query("DELETE FROM user_roles WHERE user_id = ? AND role_id = ?")
                        .bind(user_id)
                        .bind(role_id)
                        .execute(&mut *tx)
                        .await?;
                affected += result.rows_affected();
            }
        }
        tx.commit().await?;
        Ok(affected)
    }

    /// Add every user in `user_ids` to every group in `group_ids`.
    pub async fn bulk_add_to_groups(
        &self,
        actor_id: i64,
        user_ids: &[i64],
        group_ids: &[i64],
    ) -> Result<u64> {
        if user_ids.is_empty() || group_ids.is_empty() {
            return Err(AppError::Validation(
                "user_ids and group_ids must be non-empty".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;
        let mut affected = 0;
        for user_id in user_ids {
            for group_id in group_ids {
                let result = sqlx::query(
                    "INSERT OR IGNORE INTO user_group_members (user_id, group_id, added_by) VALUES (?, ?, ?)",
                )
                .bind(user_id)
                .bind(group_id)
                .bind(actor_id)
                .execute(&mut *tx)
                .await?;
                affected += result.rows_affected();
            }
        }
        tx.commit().await?;
        Ok(affected)
    }

    /// Grant every permission in `permission_ids` to every group in `group_ids`.
    pub async fn bulk_assign_group_permissions(
        &self,
        group_ids: &[i64],
        permission_ids: &[i64],
    ) -> Result<u64> {
        if group_ids.is_empty() || permission_ids.is_empty() {
            return Err(AppError::Validation(
                "group_ids and permission_ids must be non-empty".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;
        let mut affected = 0;
        for group_id in group_ids {
            for permission_id in permission_ids {
                let result = sqlx::query(
                    "INSERT OR IGNORE INTO group_permissions (group_id, permission_id) VALUES (?, ?)",
                )
                .bind(group_id)
                .bind(permission_id)
                .execute(&mut *tx)
                .await?;
                affected += result.rows_affected();
            }
        }
        tx.commit().await?;
        Ok(affected)
    }

    /// Replace a role's permission set atomically. An empty list clears it.
    pub async fn set_role_permissions(&self, role_id: i64, permission_ids: &[i64]) -> Result<()> {
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM role_permissions WHERE role_id = ?")
            .bind(role_id)
            .execute(&mut *tx)
            .await?;
        for permission_id in permission_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO role_permissions (role_id, permission_id) VALUES (?, ?)",
            )
            .bind(role_id)
            .bind(permission_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Replace a group's permission set atomically. An empty list clears it.
    pub async fn set_group_permissions(&self, group_id: i64, permission_ids: &[i64]) -> Result<()> {
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM group_permissions WHERE group_id = ?")
            .bind(group_id)
            .execute(&mut *tx)
            .await?;
        for permission_id in permission_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO group_permissions (group_id, permission_id) VALUES (?, ?)",
            )
            .bind(group_id)
            .bind(permission_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn add_group_members(
        &self,
        actor_id: i64,
        group_id: i64,
        user_ids: &[i64],
    ) -> Result<u64> {
        if user_ids.is_empty() {
            return Err(AppError::Validation("user_ids must be non-empty".to_string()));
        }

        let mut tx = self.db.begin().await?;
        let mut affected = 0;
        for user_id in user_ids {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO user_group_members (user_id, group_id, added_by) VALUES (?, ?, ?)",
            )
            .bind(user_id)
            .bind(group_id)
            .bind(actor_id)
            .execute(&mut *tx)
            .await?;
            affected += result.rows_affected();
        }
        tx.commit().await?;
        Ok(affected)
    }

    pub async fn remove_group_member(&self, group_id: i64, user_id: i64) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM user_group_members WHERE group_id = ? AND user_id = ?")
                .bind(group_id)
                .bind(user_id)
                .execute(&self.db)
                .await?;
        Ok(result.rows_affected())
    }
}
