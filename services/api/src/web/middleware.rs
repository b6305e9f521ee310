//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use reading_tracker_core::ports::PortError;
use std::sync::Arc;
use tracing::{debug, error};

use crate::error::ApiError;
use crate::web::state::{AppState, AuthUser};

/// Extracts the value of the `session` cookie, if any.
pub fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| c.trim().strip_prefix("session="))
        .filter(|id| !id.is_empty())
}

/// Middleware that validates the auth session cookie and extracts the user id.
///
/// If valid, inserts an `AuthUser` into request extensions for handlers to use.
/// If invalid or missing, responds with 401 `UNAUTHENTICATED`.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_session_id = session_cookie(req.headers()).ok_or(ApiError::Unauthenticated)?;

    let user_id = state
        .db
        .validate_auth_session(auth_session_id)
        .await
        .map_err(|e| {
            match e {
                PortError::Unauthorized => debug!("Rejected unknown or expired session"),
                other => error!("Failed to validate auth session: {:?}", other),
            }
            ApiError::Unauthenticated
        })?;

    req.extensions_mut().insert(AuthUser { user_id });

    Ok(next.run(req).await)
}
