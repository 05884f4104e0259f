//! Business logic services.

pub mod access_service;
pub mod audit_service;
pub mod auth_service;
pub mod membership_service;
pub mod permission_service;

pub use access_service::AccessService;
pub use audit_service::AuditService;
pub use auth_service::AuthService;
pub use membership_service::MembershipService;
pub use permission_service::PermissionService;
