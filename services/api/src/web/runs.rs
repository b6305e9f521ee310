//! services/api/src/web/runs.rs
//!
//! Handlers for `/reading-runs`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use reading_tracker_core::domain::{NewReadingRun, ReadingRun, ReadingRunChanges};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ErrorBody};
use crate::web::state::{AppState, AuthUser};
use crate::web::validate::{parse_id, ValidJson};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRunRequest {
    pub id: Uuid,
    pub book_id: Uuid,
    /// The page the run starts from.
    #[validate(range(min = 0, message = "Must be greater than or equal to 0"))]
    pub completed_pages: i32,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRunRequest {
    #[serde(default)]
    #[validate(range(min = 0, message = "Must be greater than or equal to 0"))]
    pub completed_pages: Option<i32>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunsParams {
    pub book_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RunResponse {
    pub id: Uuid,
    pub book_id: Uuid,
    pub user_id: Uuid,
    pub completed_pages: i32,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<ReadingRun> for RunResponse {
    fn from(run: ReadingRun) -> Self {
        Self {
            id: run.id,
            book_id: run.book_id,
            user_id: run.user_id,
            completed_pages: run.completed_pages,
            started_at: run.started_at,
            finished_at: run.finished_at,
            updated_at: run.updated_at,
            deleted_at: run.deleted_at,
        }
    }
}

/// List the runs of one book, newest first.
#[utoipa::path(
    get,
    path = "/reading-runs",
    params(("bookId" = Uuid, Query, description = "Book whose runs to list")),
    responses(
        (status = 200, description = "Runs of the book", body = [RunResponse]),
        (status = 400, description = "Missing or malformed bookId", body = ErrorBody)
    ),
    tag = "reading-runs"
)]
pub async fn list_runs_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<RunsParams>,
) -> Result<Json<Vec<RunResponse>>, ApiError> {
    let book_id = parse_id("query.bookId", params.book_id.as_deref())?;
    let runs = state.db.list_runs(auth.user_id, book_id).await?;
    Ok(Json(runs.into_iter().map(Into::into).collect()))
}

/// Open a new reading run for a book.
#[utoipa::path(
    post,
    path = "/reading-runs",
    request_body = CreateRunRequest,
    responses(
        (status = 201, description = "Run created", body = RunResponse),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 404, description = "Book absent or not owned", body = ErrorBody)
    ),
    tag = "reading-runs"
)]
pub async fn create_run_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(req): ValidJson<CreateRunRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let run = state
        .db
        .create_run(
            auth.user_id,
            NewReadingRun {
                id: req.id,
                book_id: req.book_id,
                completed_pages: req.completed_pages,
                started_at: req.started_at,
            },
        )
        .await?;
    info!("User {} opened run {} on book {}", auth.user_id, run.id, run.book_id);
    Ok((StatusCode::CREATED, Json(RunResponse::from(run))))
}

/// Update a run's progress or mark it finished.
#[utoipa::path(
    put,
    path = "/reading-runs/{runId}",
    params(("runId" = Uuid, Path, description = "Run id")),
    request_body = UpdateRunRequest,
    responses(
        (status = 200, description = "Run updated", body = RunResponse),
        (status = 404, description = "Absent or not owned", body = ErrorBody)
    ),
    tag = "reading-runs"
)]
pub async fn update_run_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(run_id): Path<String>,
    ValidJson(req): ValidJson<UpdateRunRequest>,
) -> Result<Json<RunResponse>, ApiError> {
    let run_id = parse_id("param.runId", Some(&run_id))?;
    let run = state
        .db
        .update_run(
            auth.user_id,
            run_id,
            ReadingRunChanges {
                completed_pages: req.completed_pages,
                finished_at: req.finished_at,
            },
        )
        .await?;
    Ok(Json(run.into()))
}

/// Soft-delete a run.
#[utoipa::path(
    delete,
    path = "/reading-runs/{runId}",
    params(("runId" = Uuid, Path, description = "Run id")),
    responses(
        (status = 204, description = "Run deleted"),
        (status = 404, description = "Absent or not owned", body = ErrorBody)
    ),
    tag = "reading-runs"
)]
pub async fn delete_run_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(run_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let run_id = parse_id("param.runId", Some(&run_id))?;
    state.db.delete_run(auth.user_id, run_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
