//! Authentication middleware.
//!
//! Extracts and validates the JWT credential from requests.
//!
//! Supported locations, in precedence order:
//! - `auth_token` cookie (set by login, HttpOnly)
//! - `Authorization: Bearer <jwt_token>` header

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, COOKIE, USER_AGENT},
        HeaderMap, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::api::SharedState;

/// Name of the session cookie carrying the JWT.
pub const AUTH_COOKIE: &str = "auth_token";

/// Extension that holds the authenticated actor for downstream handlers.
///
/// `roles` is the snapshot from the token; guards that matter re-resolve
/// against the database. The client fields feed the audit trail.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: i64,
    pub email: String,
    pub roles: Vec<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Token extraction result
#[derive(Debug)]
enum ExtractedToken {
    /// JWT from the session cookie or Bearer scheme
    Token(String),
    /// No token found
    None,
    /// Authorization header present but not Bearer
    Invalid,
}

/// Pull the token value out of a Cookie header line.
fn token_from_cookie_header(cookies: &str) -> Option<String> {
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == AUTH_COOKIE && !value.is_empty()).then(|| value.to_string())
    })
}

/// Extract the credential from request headers, cookie first.
fn extract_token(headers: &HeaderMap) -> ExtractedToken {
    if let Some(cookies) = headers.get(COOKIE).and_then(|h| h.to_str().ok()) {
        if let Some(token) = token_from_cookie_header(cookies) {
            return ExtractedToken::Token(token);
        }
    }

    if let Some(auth_header) = headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok()) {
        return match auth_header.strip_prefix("Bearer ") {
            Some(token) if !token.is_empty() => ExtractedToken::Token(token.to_string()),
            _ => ExtractedToken::Invalid,
        };
    }

    ExtractedToken::None
}

/// Best-effort client IP: first X-Forwarded-For hop, then X-Real-Ip.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
    }
    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(|ip| ip.to_string())
}

/// Authentication middleware function - requires a valid token
pub async fn auth_middleware(
    State(state): State<SharedState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match extract_token(request.headers()) {
        ExtractedToken::Token(token) => token,
        ExtractedToken::None => {
            return (StatusCode::UNAUTHORIZED, "Missing authentication token").into_response();
        }
        ExtractedToken::Invalid => {
            return (StatusCode::UNAUTHORIZED, "Invalid authorization header format")
                .into_response();
        }
    };

    match state.auth.validate_token(&token) {
        Ok(claims) => {
            let headers = request.headers();
            let actor = Actor {
                user_id: claims.sub,
                email: claims.email,
                roles: claims.roles,
                ip_address: client_ip(headers),
                user_agent: headers
                    .get(USER_AGENT)
                    .and_then(|h| h.to_str().ok())
                    .map(|ua| ua.to_string()),
            };
            request.extensions_mut().insert(actor);
            next.run(request).await
        }
        Err(_) => (StatusCode::UNAUTHORIZED, "Invalid or expired token").into_response(),
    }
}
