//! services/api/src/web/sessions.rs
//!
//! Handlers for `/reading-sessions`. Creating a session is the one
//! multi-statement write: it also moves the run's `completedPages` to the
//! session's end page, atomically.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use reading_tracker_core::domain::{NewReadingSession, ReadingSession, ReadingSessionChanges};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{ApiError, ErrorBody};
use crate::web::state::{AppState, AuthUser};
use crate::web::validate::{parse_id, schema_error, ValidJson};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "create_ordering", skip_on_field_errors = false))]
pub struct CreateSessionRequest {
    pub id: Uuid,
    pub run_id: Uuid,
    #[validate(range(min = 0, message = "Must be greater than or equal to 0"))]
    pub start_page: i32,
    pub end_page: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Elapsed reading time in seconds.
    #[validate(range(min = 0, message = "Must be greater than or equal to 0"))]
    pub read_time: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "update_ordering", skip_on_field_errors = false))]
pub struct UpdateSessionRequest {
    #[serde(default)]
    #[validate(range(min = 0, message = "Must be greater than or equal to 0"))]
    pub start_page: Option<i32>,
    #[serde(default)]
    pub end_page: Option<i32>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    #[validate(range(min = 0, message = "Must be greater than or equal to 0"))]
    pub read_time: Option<i32>,
}

/// Page and time ordering. Either side may be absent on an update; the
/// pair is only checked when both are present.
fn check_ordering(
    pages: Option<(i32, i32)>,
    times: Option<(DateTime<Utc>, DateTime<Utc>)>,
) -> Result<(), ValidationError> {
    if let Some((start_page, end_page)) = pages {
        if end_page < start_page {
            return Err(schema_error(
                "end_page",
                "page_order",
                "Must be greater than or equal to startPage",
            ));
        }
    }
    if let Some((start_time, end_time)) = times {
        if end_time < start_time {
            return Err(schema_error(
                "end_time",
                "time_order",
                "Must not be before startTime",
            ));
        }
    }
    Ok(())
}

fn create_ordering(req: &CreateSessionRequest) -> Result<(), ValidationError> {
    check_ordering(
        Some((req.start_page, req.end_page)),
        Some((req.start_time, req.end_time)),
    )
}

fn update_ordering(req: &UpdateSessionRequest) -> Result<(), ValidationError> {
    check_ordering(
        req.start_page.zip(req.end_page),
        req.start_time.zip(req.end_time),
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionsParams {
    pub run_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: Uuid,
    pub run_id: Uuid,
    pub user_id: Uuid,
    pub start_page: i32,
    pub end_page: i32,
    /// Always `endPage - startPage`, computed by the server.
    pub read_pages: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub read_time: i32,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<ReadingSession> for SessionResponse {
    fn from(session: ReadingSession) -> Self {
        Self {
            id: session.id,
            run_id: session.run_id,
            user_id: session.user_id,
            start_page: session.start_page,
            end_page: session.end_page,
            read_pages: session.read_pages,
            start_time: session.start_time,
            end_time: session.end_time,
            read_time: session.read_time,
            updated_at: session.updated_at,
            deleted_at: session.deleted_at,
        }
    }
}

/// List the sessions of one run, most recent first.
#[utoipa::path(
    get,
    path = "/reading-sessions",
    params(("runId" = Uuid, Query, description = "Run whose sessions to list")),
    responses(
        (status = 200, description = "Sessions of the run", body = [SessionResponse]),
        (status = 400, description = "Missing or malformed runId", body = ErrorBody)
    ),
    tag = "reading-sessions"
)]
pub async fn list_sessions_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<SessionsParams>,
) -> Result<Json<Vec<SessionResponse>>, ApiError> {
    let run_id = parse_id("query.runId", params.run_id.as_deref())?;
    let sessions = state.db.list_sessions(auth.user_id, run_id).await?;
    Ok(Json(sessions.into_iter().map(Into::into).collect()))
}

/// Record a finished reading session and advance its run.
#[utoipa::path(
    post,
    path = "/reading-sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session recorded, run updated", body = SessionResponse),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 404, description = "Run absent or not owned; nothing was written", body = ErrorBody)
    ),
    tag = "reading-sessions"
)]
pub async fn create_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(req): ValidJson<CreateSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .db
        .finish_session(
            auth.user_id,
            NewReadingSession {
                id: req.id,
                run_id: req.run_id,
                start_page: req.start_page,
                end_page: req.end_page,
                start_time: req.start_time,
                end_time: req.end_time,
                read_time: req.read_time,
            },
        )
        .await?;
    info!(
        "User {} finished session {} on run {}",
        auth.user_id, session.id, session.run_id
    );
    Ok((StatusCode::CREATED, Json(SessionResponse::from(session))))
}

/// Correct a recorded session. `readPages` is recomputed.
#[utoipa::path(
    put,
    path = "/reading-sessions/{sessionId}",
    params(("sessionId" = Uuid, Path, description = "Session id")),
    request_body = UpdateSessionRequest,
    responses(
        (status = 200, description = "Session updated", body = SessionResponse),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 404, description = "Absent or not owned", body = ErrorBody)
    ),
    tag = "reading-sessions"
)]
pub async fn update_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(session_id): Path<String>,
    ValidJson(req): ValidJson<UpdateSessionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session_id = parse_id("param.sessionId", Some(&session_id))?;
    let session = state
        .db
        .update_session(
            auth.user_id,
            session_id,
            ReadingSessionChanges {
                start_page: req.start_page,
                end_page: req.end_page,
                start_time: req.start_time,
                end_time: req.end_time,
                read_time: req.read_time,
            },
        )
        .await?;
    Ok(Json(session.into()))
}

/// Soft-delete a session.
#[utoipa::path(
    delete,
    path = "/reading-sessions/{sessionId}",
    params(("sessionId" = Uuid, Path, description = "Session id")),
    responses(
        (status = 204, description = "Session deleted"),
        (status = 404, description = "Absent or not owned", body = ErrorBody)
    ),
    tag = "reading-sessions"
)]
pub async fn delete_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let session_id = parse_id("param.sessionId", Some(&session_id))?;
    state.db.delete_session(auth.user_id, session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
