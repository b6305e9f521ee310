//! crates/reading_tracker_core/src/reconcile.rs
//!
//! Client-side start/finish flows that tie the local stopwatch to the
//! server's reading runs and sessions.
//!
//! Starting decides whether the latest run is continued or a new run is
//! opened. Finishing posts the session and only then clears the stopwatch, so a
//! failed request never loses the elapsed time.

use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{Book, BookSnapshot, NewReadingRun, NewReadingSession, ReadingRun, ReadingSession};
use crate::ports::{PortError, ReadingApi};
use crate::timer::{SessionStore, TimerError};

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error(transparent)]
    Timer(#[from] TimerError),
    #[error(transparent)]
    Api(#[from] PortError),
    #[error("Start page must be between 0 and {total_pages}, got {start_page}")]
    StartPageOutOfRange { start_page: i32, total_pages: i32 },
    #[error("End page must be between {start_page} and {total_pages}, got {end_page}")]
    EndPageOutOfRange {
        start_page: i32,
        end_page: i32,
        total_pages: i32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunChoice {
    /// Continue the unfinished run with this id.
    Reuse(Uuid),
    /// No run yet, or the last one reached the final page.
    CreateNew,
}

/// The most recently started run, ties broken by id (ids are UUIDv7, so
/// time ordered).
pub fn latest_run(runs: &[ReadingRun]) -> Option<&ReadingRun> {
    runs.iter().max_by_key(|run| (run.started_at, run.id))
}

pub fn choose_run(total_pages: i32, latest: Option<&ReadingRun>) -> RunChoice {
    match latest {
        Some(run) if !run.is_complete(total_pages) => RunChoice::Reuse(run.id),
        _ => RunChoice::CreateNew,
    }
}

/// The page offered when starting: where the unfinished run stopped, else 0.
pub fn default_start_page(total_pages: i32, latest: Option<&ReadingRun>) -> i32 {
    match latest {
        Some(run) if !run.is_complete(total_pages) => run.completed_pages,
        _ => 0,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartedReading {
    pub run_id: Uuid,
    pub created_run: Option<ReadingRun>,
}

/// Starts the stopwatch for `book`, opening a new run on the server first
/// when the latest one cannot be continued.
///
/// Any failure leaves the stopwatch untouched and is returned to the caller.
pub async fn start_reading(
    api: &dyn ReadingApi,
    store: &mut SessionStore,
    book: &Book,
    latest: Option<&ReadingRun>,
    start_page: i32,
) -> Result<StartedReading, FlowError> {
    if let Some(active) = store.session() {
        return Err(TimerError::AlreadyActive(active.book.title.clone()).into());
    }
    if start_page < 0 || start_page > book.total_pages {
        return Err(FlowError::StartPageOutOfRange {
            start_page,
            total_pages: book.total_pages,
        });
    }

    let started_at = store.now();
    let (run_id, created_run) = match choose_run(book.total_pages, latest) {
        RunChoice::Reuse(run_id) => (run_id, None),
        RunChoice::CreateNew => {
            let run = api
                .create_run(&NewReadingRun {
                    id: Uuid::now_v7(),
                    book_id: book.id,
                    completed_pages: start_page,
                    started_at,
                })
                .await?;
            info!("Opened reading run {} for book {}", run.id, book.id);
            (run.id, Some(run))
        }
    };

    store.start(BookSnapshot::from(book), run_id, started_at, start_page)?;
    Ok(StartedReading {
        run_id,
        created_run,
    })
}

/// Pauses the stopwatch, records the session on the server and clears the
/// stopwatch once the server has accepted it.
pub async fn finish_reading(
    api: &dyn ReadingApi,
    store: &mut SessionStore,
    end_page: i32,
) -> Result<ReadingSession, FlowError> {
    let Some(active) = store.session() else {
        return Err(TimerError::NoActiveSession.into());
    };
    let total_pages = active.book.total_pages;
    let upper_bound = if total_pages > 0 { total_pages } else { i32::MAX };
    if end_page < active.start_page || end_page > upper_bound {
        return Err(FlowError::EndPageOutOfRange {
            start_page: active.start_page,
            end_page,
            total_pages,
        });
    }

    store.pause()?;
    let paused = store.session().cloned().ok_or(TimerError::NoActiveSession)?;
    let end_time = paused.last_paused_at.unwrap_or_else(|| store.now());

    let request = NewReadingSession {
        id: Uuid::now_v7(),
        run_id: paused.run_id,
        start_page: paused.start_page,
        end_page,
        start_time: paused.started_at,
        end_time,
        read_time: paused.read_time.floor() as i32,
    };
    let created = api.create_session(&request).await?;

    if let Err(e) = store.finish() {
        warn!(
            "Reading session {} was saved but the local timer could not be cleared: {}",
            created.id, e
        );
        return Err(e.into());
    }
    info!(
        "Finished reading session {}: {} pages in {}s",
        created.id, created.read_pages, created.read_time
    );
    Ok(created)
}
