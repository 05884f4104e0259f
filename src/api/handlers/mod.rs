//! HTTP request handlers.

pub mod access;
pub mod audit;
pub mod auth;
pub mod bulk;
pub mod groups;
pub mod health;
pub mod permissions;
pub mod roles;
pub mod setup;
pub mod tools;
pub mod users;

use serde::Serialize;

/// Response for mutations whose interesting outcome is a row count.
#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub affected: u64,
}

/// Plain message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
