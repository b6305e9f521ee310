//! crates/reading_tracker_core/src/domain.rs
//!
//! Defines the core data structures for the reading tracker.
//! They carry serde derives because the same shapes travel over HTTP and into
//! the client's persisted session record; the wire format is camelCase.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Books
//=========================================================================================

/// A book registered by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub author: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub isbn13: Option<String>,
    pub publish_date: Option<NaiveDate>,
    pub total_pages: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A book as shown in the list view, augmented with the progress of its most
/// recent reading run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSummary {
    #[serde(flatten)]
    pub book: Book,
    /// `completedPages` of the latest run, 0 when the book has never been started.
    pub completed_pages: i32,
    /// `updatedAt` of the latest run, or the book's own `updatedAt`.
    pub last_activity_at: DateTime<Utc>,
}

/// Fields supplied when registering a book. The id is generated by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    pub id: Uuid,
    pub title: String,
    pub total_pages: i32,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub publish_date: Option<NaiveDate>,
    #[serde(default)]
    pub isbn: Option<String>,
}

/// Replacement values for an existing book (`PUT` semantics).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookChanges {
    pub title: String,
    pub total_pages: i32,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub publish_date: Option<NaiveDate>,
    #[serde(default)]
    pub isbn: Option<String>,
}

//=========================================================================================
// Reading Runs
//=========================================================================================

/// One read-through attempt of a book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingRun {
    pub id: Uuid,
    pub book_id: Uuid,
    pub user_id: Uuid,
    pub completed_pages: i32,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ReadingRun {
    pub fn is_complete(&self, total_pages: i32) -> bool {
        self.completed_pages == total_pages
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReadingRun {
    pub id: Uuid,
    pub book_id: Uuid,
    pub completed_pages: i32,
    pub started_at: DateTime<Utc>,
}

/// Partial update of a run. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingRunChanges {
    #[serde(default)]
    pub completed_pages: Option<i32>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

//=========================================================================================
// Reading Sessions
//=========================================================================================

/// One timed, contiguous interval of reading within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingSession {
    pub id: Uuid,
    pub run_id: Uuid,
    pub user_id: Uuid,
    pub start_page: i32,
    pub end_page: i32,
    pub read_pages: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Elapsed reading time in whole seconds.
    pub read_time: i32,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// The payload of a finished reading session. `readPages` is never part of
/// it: the server derives it from the page range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReadingSession {
    pub id: Uuid,
    pub run_id: Uuid,
    pub start_page: i32,
    pub end_page: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub read_time: i32,
}

impl NewReadingSession {
    pub fn read_pages(&self) -> i32 {
        self.end_page - self.start_page
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingSessionChanges {
    #[serde(default)]
    pub start_page: Option<i32>,
    #[serde(default)]
    pub end_page: Option<i32>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub read_time: Option<i32>,
}

//=========================================================================================
// Client Reading Session (persisted locally, never on the server)
//=========================================================================================

/// The part of a book the client keeps alongside an active session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSnapshot {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub total_pages: i32,
}

impl From<&Book> for BookSnapshot {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            author: book.author.clone(),
            total_pages: book.total_pages,
        }
    }
}

/// The running or paused stopwatch of the reading session in progress.
///
/// Fields added after the first client release carry `#[serde(default)]` so an
/// older record still loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSession {
    pub book: BookSnapshot,
    pub run_id: Uuid,
    #[serde(default)]
    pub paused: bool,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub start_page: i32,
    /// Accumulated seconds up to the last pause.
    #[serde(default)]
    pub read_time: f64,
    #[serde(default)]
    pub last_paused_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_continued_at: Option<DateTime<Utc>>,
}

//=========================================================================================
// Users (owned by the auth collaborator)
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
}

// Only used internally for login/signup - contains the password hash
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}
