//! services/api/src/web/health.rs
//!
//! Liveness and readiness checks.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;
use utoipa::ToSchema;

use crate::web::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthStatus {
    pub status: String,
}

/// The process is up.
#[utoipa::path(
    get,
    path = "/healthz",
    responses((status = 200, description = "Alive", body = HealthStatus)),
    tag = "health"
)]
pub async fn healthz_handler() -> Json<HealthStatus> {
    Json(HealthStatus { status: "ok".to_string() })
}

/// The process can reach its database.
#[utoipa::path(
    get,
    path = "/readyz",
    responses(
        (status = 200, description = "Ready", body = HealthStatus),
        (status = 503, description = "Database unreachable", body = HealthStatus)
    ),
    tag = "health"
)]
pub async fn readyz_handler(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthStatus>) {
    match state.db.ping().await {
        Ok(()) => (StatusCode::OK, Json(HealthStatus { status: "ready".to_string() })),
        Err(e) => {
            warn!("Readiness check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthStatus {
                    status: "not-ready".to_string(),
                }),
            )
        }
    }
}
