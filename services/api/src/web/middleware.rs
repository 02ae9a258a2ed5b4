//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use crate::web::state::AppState;

const AUTH_COOKIE: &str = "session=";

/// Pulls the auth session id out of a `Cookie` header value.
fn auth_session_id(cookie_header: &str) -> Option<&str> {
    cookie_header
        .split(';')
        .find_map(|c| c.trim().strip_prefix(AUTH_COOKIE))
        .filter(|id| !id.is_empty())
}

/// Resolves the auth session cookie into the owning user's id.
///
/// The user id is inserted into the request extensions for handlers to use.
/// A missing, unknown or expired session yields 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let session_id = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(auth_session_id)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let user_id = state
        .db
        .validate_auth_session(session_id)
        .await
        .map_err(|e| {
            warn!("Rejected auth session: {}", e);
            StatusCode::UNAUTHORIZED
        })?;

    req.extensions_mut().insert(user_id);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_session_among_other_cookies() {
        assert_eq!(auth_session_id("theme=dark; session=abc123; lang=en"), Some("abc123"));
    }

    #[test]
    fn missing_or_empty_session_is_none() {
        assert_eq!(auth_session_id("theme=dark"), None);
        assert_eq!(auth_session_id("session="), None);
    }
}
