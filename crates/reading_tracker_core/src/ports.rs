//! crates/reading_tracker_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the reading tracker.
//! The server implements `DatabaseService` on top of PostgreSQL; the client
//! implements `ReadingApi` over HTTP and `SessionStorage` over a local file.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    ActiveSession, Book, BookChanges, BookSummary, NewBook, NewReadingRun, NewReadingSession,
    ReadingRun, ReadingRunChanges, ReadingSession, ReadingSessionChanges, User, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    Invalid(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Server Side
//=========================================================================================

/// Persistence for books, runs and sessions, plus the auth tables.
///
/// Every book/run/session method takes the caller's `user_id` and must scope
/// its statement by it. A row that exists but belongs to someone else is
/// reported exactly like a missing one: `PortError::NotFound`.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Health ---
    async fn ping(&self) -> PortResult<()>;

    // --- Auth ---
    async fn create_user_with_email(&self, email: &str, hashed_password: &str)
        -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Books ---
    async fn list_books(&self, user_id: Uuid, query: Option<&str>)
        -> PortResult<Vec<BookSummary>>;

    async fn get_book(&self, user_id: Uuid, book_id: Uuid) -> PortResult<Book>;

    async fn create_book(&self, user_id: Uuid, book: NewBook) -> PortResult<Book>;

    async fn update_book(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        changes: BookChanges,
    ) -> PortResult<Book>;

    async fn delete_book(&self, user_id: Uuid, book_id: Uuid) -> PortResult<()>;

    // --- Reading Runs ---
    async fn list_runs(&self, user_id: Uuid, book_id: Uuid) -> PortResult<Vec<ReadingRun>>;

    /// Fails with `NotFound` when the book is absent or not owned by `user_id`.
    async fn create_run(&self, user_id: Uuid, run: NewReadingRun) -> PortResult<ReadingRun>;

    async fn update_run(
        &self,
        user_id: Uuid,
        run_id: Uuid,
        changes: ReadingRunChanges,
    ) -> PortResult<ReadingRun>;

    async fn delete_run(&self, user_id: Uuid, run_id: Uuid) -> PortResult<()>;

    // --- Reading Sessions ---
    async fn list_sessions(&self, user_id: Uuid, run_id: Uuid)
        -> PortResult<Vec<ReadingSession>>;

    /// Sets the run's `completedPages` to `session.end_page` and inserts the
    /// session, as one transaction. When the run cannot be updated nothing is
    /// written and `NotFound` is returned.
    async fn finish_session(
        &self,
        user_id: Uuid,
        session: NewReadingSession,
    ) -> PortResult<ReadingSession>;

    async fn update_session(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        changes: ReadingSessionChanges,
    ) -> PortResult<ReadingSession>;

    async fn delete_session(&self, user_id: Uuid, session_id: Uuid) -> PortResult<()>;
}

//=========================================================================================
// Client Side
//=========================================================================================

/// The HTTP surface of the server as seen by a client. The caller's identity
/// is carried by the implementation (session cookie), not by the arguments.
#[async_trait]
pub trait ReadingApi: Send + Sync {
    async fn list_books(&self, query: Option<&str>) -> PortResult<Vec<BookSummary>>;

    async fn get_book(&self, book_id: Uuid) -> PortResult<Book>;

    async fn create_book(&self, book: &NewBook) -> PortResult<Book>;

    async fn list_runs(&self, book_id: Uuid) -> PortResult<Vec<ReadingRun>>;

    async fn create_run(&self, run: &NewReadingRun) -> PortResult<ReadingRun>;

    async fn list_sessions(&self, run_id: Uuid) -> PortResult<Vec<ReadingSession>>;

    async fn create_session(&self, session: &NewReadingSession) -> PortResult<ReadingSession>;
}

/// Durable storage for the single active reading session.
pub trait SessionStorage: Send {
    /// Returns `None` when nothing has been stored yet.
    fn load(&self) -> PortResult<Option<ActiveSession>>;

    /// Replaces the stored record; `None` clears it.
    fn save(&self, session: Option<&ActiveSession>) -> PortResult<()>;
}

/// Source of wall-clock time for the session timer.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
