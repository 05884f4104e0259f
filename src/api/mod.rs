//! API module - HTTP handlers and middleware.

pub mod handlers;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::services::{
    AccessService, AuditService, AuthService, MembershipService, PermissionService,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub db: SqlitePool,
    pub auth: AuthService,
    pub permissions: PermissionService,
    pub access: AccessService,
    pub memberships: MembershipService,
    pub audit: AuditService,
}

impl AppState {
    pub fn new(config: Config, db: SqlitePool) -> Self {
        let auth = AuthService::new(db.clone(), &config.jwt_secret, config.jwt_expiry_hours);
        Self {
            auth,
            permissions: PermissionService::new(db.clone()),
            access: AccessService::new(db.clone()),
            memberships: MembershipService::new(db.clone()),
            audit: AuditService::new(db.clone()),
            config,
            db,
        }
    }
}

pub type SharedState = Arc<AppState>;
