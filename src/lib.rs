//! Toolgate - Backend Library
//!
//! Access governance service: role- and group-based authorization with a
//! role hierarchy, an access-request lifecycle (request / approve / reject /
//! grant / revoke), and an append-only audit trail.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod telemetry;

pub use config::Config;
pub use error::{AppError, Result};
