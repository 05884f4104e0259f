//! Shared test harness: seeded in-memory database and fixture helpers.

#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use toolgate::api::{AppState, SharedState};
use toolgate::models::user::User;
use toolgate::{db, Config};

/// A seeded in-memory database.
///
/// A single connection is required: every pooled connection to
/// `sqlite::memory:` would otherwise get its own empty database.
pub async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("valid sqlite url")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("connect to in-memory database");

    db::init(&pool).await.expect("apply schema and seed");
    pool
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        bind_address: "127.0.0.1:0".to_string(),
        log_level: "warn".to_string(),
        jwt_secret: "test-secret".to_string(),
        jwt_expiry_hours: 1,
    }
}

pub async fn test_state() -> SharedState {
    let pool = test_pool().await;
    Arc::new(AppState::new(test_config(), pool))
}

/// Insert a user with a placeholder password hash.
pub async fn create_user(pool: &SqlitePool, email: &str) -> i64 {
    sqlx::query("INSERT INTO users (email, password_hash) VALUES (?, 'not-a-real-hash')")
        .bind(email)
        .execute(pool)
        .await
        .expect("insert user")
        .last_insert_rowid()
}

pub async fn role_id(pool: &SqlitePool, name: &str) -> i64 {
    sqlx::query_scalar("SELECT id FROM roles WHERE name = ?")
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("seeded role exists")
}

pub async fn assign_role(pool: &SqlitePool, user_id: i64, role_name: &str) {
    let role = role_id(pool, role_name).await;
    sqlx::query("INSERT OR IGNORE INTO user_roles (user_id, role_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(role)
        .execute(pool)
        .await
        .expect("assign role");
}

pub async fn create_tool(pool: &SqlitePool, name: &str) -> i64 {
    sqlx::query("INSERT INTO tools (name, display_name) VALUES (?, ?)")
        .bind(name)
        .bind(name)
        .execute(pool)
        .await
        .expect("insert tool")
        .last_insert_rowid()
}

pub async fn create_group(pool: &SqlitePool, name: &str) -> i64 {
    sqlx::query("INSERT INTO groups (name, display_name) VALUES (?, ?)")
        .bind(name)
        .bind(name)
        .execute(pool)
        .await
        .expect("insert group")
        .last_insert_rowid()
}

pub async fn add_group_member(pool: &SqlitePool, group_id: i64, user_id: i64) {
    sqlx::query("INSERT OR IGNORE INTO user_group_members (user_id, group_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(group_id)
        .execute(pool)
        .await
        .expect("add group member");
}

pub async fn grant_group_permission(pool: &SqlitePool, group_id: i64, permission: &str) {
    sqlx::query(
        "INSERT OR IGNORE INTO group_permissions (group_id, permission_id)
         SELECT ?, id FROM permissions WHERE name = ?",
    )
    .bind(group_id)
    .bind(permission)
    .execute(pool)
    .await
    .expect("grant group permission");
}

/// A signed token for an existing user, carrying their live role names.
pub async fn token_for(state: &SharedState, user_id: i64) -> String {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(&state.db)
        .await
        .expect("user exists");
    let roles = state
        .permissions
        .role_names(user_id)
        .await
        .expect("load roles");
    state.auth.generate_token(&user, roles).expect("sign token")
}
