//! HTTP middleware: authentication and authorization guards.

pub mod auth;
pub mod rbac;
