//! Shared fixtures for the router tests: an in-memory `DatabaseService` that
//! keeps the same ownership, soft-delete and finish-atomicity rules as the
//! PostgreSQL adapter, and a small request helper.

#![allow(dead_code)]

use api_lib::{
    config::Config,
    web::{router, AppState},
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use http_body_util::BodyExt;
use reading_tracker_core::{
    domain::{
        Book, BookChanges, BookSummary, NewBook, NewReadingRun, NewReadingSession, ReadingRun,
        ReadingRunChanges, ReadingSession, ReadingSessionChanges, User, UserCredentials,
    },
    ports::{DatabaseService, PortError, PortResult},
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tower::ServiceExt;
use uuid::Uuid;

//=========================================================================================
// In-memory database
//=========================================================================================

#[derive(Default)]
struct Tables {
    users: Vec<UserCredentials>,
    auth_sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    books: Vec<Book>,
    runs: Vec<ReadingRun>,
    sessions: Vec<ReadingSession>,
}

#[derive(Default)]
pub struct InMemoryDb {
    tables: Mutex<Tables>,
    /// Makes the session insert of `finish_session` fail after the run update.
    pub fail_session_insert: AtomicBool,
    /// Makes `ping` fail.
    pub unreachable: AtomicBool,
}

impl InMemoryDb {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("tables lock poisoned")
    }

    /// Registers a user and a live auth session, returning both ids.
    pub fn seed_user(&self, email: &str) -> (Uuid, String) {
        let user_id = Uuid::now_v7();
        let token = Uuid::new_v4().to_string();
        let mut tables = self.tables();
        tables.users.push(UserCredentials {
            user_id,
            email: email.to_string(),
            hashed_password: "unused".to_string(),
        });
        tables
            .auth_sessions
            .insert(token.clone(), (user_id, Utc::now() + Duration::days(1)));
        (user_id, token)
    }

    pub fn expire_auth_session(&self, token: &str) {
        if let Some(entry) = self.tables().auth_sessions.get_mut(token) {
            entry.1 = Utc::now() - Duration::seconds(1);
        }
    }

    pub fn session_count(&self) -> usize {
        self.tables().sessions.len()
    }

    pub fn run(&self, run_id: Uuid) -> Option<ReadingRun> {
        self.tables().runs.iter().find(|r| r.id == run_id).cloned()
    }

    pub fn session(&self, session_id: Uuid) -> Option<ReadingSession> {
        self.tables()
            .sessions
            .iter()
            .find(|s| s.id == session_id)
            .cloned()
    }

    pub fn book(&self, book_id: Uuid) -> Option<Book> {
        self.tables().books.iter().find(|b| b.id == book_id).cloned()
    }
}

fn book_is_live(tables: &Tables, user_id: Uuid, book_id: Uuid) -> bool {
    tables
        .books
        .iter()
        .any(|b| b.id == book_id && b.user_id == user_id && b.deleted_at.is_none())
}

fn duplicate_id(what: &str) -> PortError {
    PortError::Invalid(format!("{} already exists", what))
}

#[async_trait]
impl DatabaseService for InMemoryDb {
    async fn ping(&self) -> PortResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("connection refused".to_string()));
        }
        Ok(())
    }

    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let mut tables = self.tables();
        if tables.users.iter().any(|u| u.email == email) {
            return Err(duplicate_id("User"));
        }
        let user_id = Uuid::now_v7();
        tables.users.push(UserCredentials {
            user_id,
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
        });
        Ok(User {
            user_id,
            email: email.to_string(),
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.tables()
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound("User".to_string()))
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        self.tables()
            .users
            .iter()
            .find(|u| u.user_id == user_id)
            .map(|u| User {
                user_id: u.user_id,
                email: u.email.clone(),
            })
            .ok_or_else(|| PortError::NotFound("User".to_string()))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.tables()
            .auth_sessions
            .insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        match self.tables().auth_sessions.get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.tables().auth_sessions.remove(session_id);
        Ok(())
    }

    async fn list_books(
        &self,
        user_id: Uuid,
        query: Option<&str>,
    ) -> PortResult<Vec<BookSummary>> {
        let tables = self.tables();
        let needle = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);

        let mut summaries: Vec<BookSummary> = tables
            .books
            .iter()
            .filter(|b| b.user_id == user_id && b.deleted_at.is_none())
            .filter(|b| match &needle {
                None => true,
                Some(needle) => {
                    b.title.to_lowercase().contains(needle)
                        || b.author
                            .as_deref()
                            .is_some_and(|a| a.to_lowercase().contains(needle))
                }
            })
            .map(|b| {
                let latest = tables
                    .runs
                    .iter()
                    .filter(|r| r.book_id == b.id && r.deleted_at.is_none())
                    .max_by_key(|r| (r.started_at, r.id));
                BookSummary {
                    book: b.clone(),
                    completed_pages: latest.map_or(0, |r| r.completed_pages),
                    last_activity_at: latest.map_or(b.updated_at, |r| r.updated_at),
                }
            })
            .collect();

        summaries.sort_by(|a, b| {
            (b.last_activity_at, b.book.id).cmp(&(a.last_activity_at, a.book.id))
        });
        Ok(summaries)
    }

    async fn get_book(&self, user_id: Uuid, book_id: Uuid) -> PortResult<Book> {
        self.tables()
            .books
            .iter()
            .find(|b| b.id == book_id && b.user_id == user_id && b.deleted_at.is_none())
            .cloned()
            .ok_or_else(|| PortError::NotFound("Book".to_string()))
    }

    async fn create_book(&self, user_id: Uuid, book: NewBook) -> PortResult<Book> {
        let mut tables = self.tables();
        if tables.books.iter().any(|b| b.id == book.id) {
            return Err(duplicate_id("Book"));
        }
        let now = Utc::now();
        let book = Book {
            id: book.id,
            user_id,
            title: book.title,
            author: book.author,
            description: book.description,
            language: book.language,
            isbn13: book.isbn,
            publish_date: book.publish_date,
            total_pages: book.total_pages,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.books.push(book.clone());
        Ok(book)
    }

    async fn update_book(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        changes: BookChanges,
    ) -> PortResult<Book> {
        let mut tables = self.tables();
        let book = tables
            .books
            .iter_mut()
            .find(|b| b.id == book_id && b.user_id == user_id && b.deleted_at.is_none())
            .ok_or_else(|| PortError::NotFound("Book".to_string()))?;
        book.title = changes.title;
        book.author = changes.author;
        book.description = changes.description;
        book.language = changes.language;
        book.isbn13 = changes.isbn;
        book.publish_date = changes.publish_date;
        book.total_pages = changes.total_pages;
        book.updated_at = Utc::now();
        Ok(book.clone())
    }

    async fn delete_book(&self, user_id: Uuid, book_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables();
        let book = tables
            .books
            .iter_mut()
            .find(|b| b.id == book_id && b.user_id == user_id && b.deleted_at.is_none())
            .ok_or_else(|| PortError::NotFound("Book".to_string()))?;
        let now = Utc::now();
        book.deleted_at = Some(now);
        book.updated_at = now;
        Ok(())
    }

    async fn list_runs(&self, user_id: Uuid, book_id: Uuid) -> PortResult<Vec<ReadingRun>> {
        let tables = self.tables();
        if !book_is_live(&tables, user_id, book_id) {
            return Ok(Vec::new());
        }
        let mut runs: Vec<ReadingRun> = tables
            .runs
            .iter()
            .filter(|r| r.book_id == book_id && r.user_id == user_id && r.deleted_at.is_none())
            .cloned()
            .collect();
        runs.sort_by(|a, b| (b.started_at, b.id).cmp(&(a.started_at, a.id)));
        Ok(runs)
    }

    async fn create_run(&self, user_id: Uuid, run: NewReadingRun) -> PortResult<ReadingRun> {
        let mut tables = self.tables();
        if !book_is_live(&tables, user_id, run.book_id) {
            return Err(PortError::NotFound("Book".to_string()));
        }
        if tables.runs.iter().any(|r| r.id == run.id) {
            return Err(duplicate_id("Reading run"));
        }
        let run = ReadingRun {
            id: run.id,
            book_id: run.book_id,
            user_id,
            completed_pages: run.completed_pages,
            started_at: run.started_at,
            finished_at: None,
            updated_at: Utc::now(),
            deleted_at: None,
        };
        tables.runs.push(run.clone());
        Ok(run)
    }

    async fn update_run(
        &self,
        user_id: Uuid,
        run_id: Uuid,
        changes: ReadingRunChanges,
    ) -> PortResult<ReadingRun> {
        let mut tables = self.tables();
        let run = tables
            .runs
            .iter_mut()
            .find(|r| r.id == run_id && r.user_id == user_id && r.deleted_at.is_none())
            .ok_or_else(|| PortError::NotFound("Reading run".to_string()))?;
        if let Some(pages) = changes.completed_pages {
            run.completed_pages = pages;
        }
        if let Some(finished_at) = changes.finished_at {
            run.finished_at = Some(finished_at);
        }
        run.updated_at = Utc::now();
        Ok(run.clone())
    }

    async fn delete_run(&self, user_id: Uuid, run_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables();
        let run = tables
            .runs
            .iter_mut()
            .find(|r| r.id == run_id && r.user_id == user_id && r.deleted_at.is_none())
            .ok_or_else(|| PortError::NotFound("Reading run".to_string()))?;
        let now = Utc::now();
        run.deleted_at = Some(now);
        run.updated_at = now;
        Ok(())
    }

    async fn list_sessions(
        &self,
        user_id: Uuid,
        run_id: Uuid,
    ) -> PortResult<Vec<ReadingSession>> {
        let mut sessions: Vec<ReadingSession> = self
            .tables()
            .sessions
            .iter()
            .filter(|s| s.run_id == run_id && s.user_id == user_id && s.deleted_at.is_none())
            .cloned()
            .collect();
        sessions.sort_by(|a, b| (b.start_time, b.id).cmp(&(a.start_time, a.id)));
        Ok(sessions)
    }

    async fn finish_session(
        &self,
        user_id: Uuid,
        session: NewReadingSession,
    ) -> PortResult<ReadingSession> {
        let mut tables = self.tables();

        // Work on copies and swap them in only when both writes succeed.
        let mut runs = tables.runs.clone();
        let run = runs
            .iter_mut()
            .find(|r| r.id == session.run_id && r.user_id == user_id && r.deleted_at.is_none())
            .ok_or_else(|| PortError::NotFound("Reading run".to_string()))?;
        let total_pages = tables
            .books
            .iter()
            .find(|b| b.id == run.book_id)
            .map(|b| b.total_pages)
            .filter(|total| session.end_page <= *total)
            .ok_or_else(|| PortError::NotFound("Reading run".to_string()))?;
        run.completed_pages = session.end_page;
        if total_pages == session.end_page {
            run.finished_at = Some(session.end_time);
        }
        run.updated_at = Utc::now();

        // A failed insert aborts the whole finish, reported like a missing run.
        if self.fail_session_insert.load(Ordering::SeqCst)
            || tables.sessions.iter().any(|s| s.id == session.id)
        {
            return Err(PortError::NotFound("Reading run".to_string()));
        }

        let recorded = ReadingSession {
            id: session.id,
            run_id: session.run_id,
            user_id,
            start_page: session.start_page,
            end_page: session.end_page,
            read_pages: session.read_pages(),
            start_time: session.start_time,
            end_time: session.end_time,
            read_time: session.read_time,
            updated_at: Utc::now(),
            deleted_at: None,
        };
        tables.runs = runs;
        tables.sessions.push(recorded.clone());
        Ok(recorded)
    }

    async fn update_session(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        changes: ReadingSessionChanges,
    ) -> PortResult<ReadingSession> {
        let mut tables = self.tables();
        let session = tables
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id && s.user_id == user_id && s.deleted_at.is_none())
            .ok_or_else(|| PortError::NotFound("Reading session".to_string()))?;
        if let Some(v) = changes.start_page {
            session.start_page = v;
        }
        if let Some(v) = changes.end_page {
            session.end_page = v;
        }
        if let Some(v) = changes.start_time {
            session.start_time = v;
        }
        if let Some(v) = changes.end_time {
            session.end_time = v;
        }
        if let Some(v) = changes.read_time {
            session.read_time = v;
        }
        session.read_pages = session.end_page - session.start_page;
        session.updated_at = Utc::now();
        Ok(session.clone())
    }

    async fn delete_session(&self, user_id: Uuid, session_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables();
        let session = tables
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id && s.user_id == user_id && s.deleted_at.is_none())
            .ok_or_else(|| PortError::NotFound("Reading session".to_string()))?;
        let now = Utc::now();
        session.deleted_at = Some(now);
        session.updated_at = now;
        Ok(())
    }
}

//=========================================================================================
// Test application
//=========================================================================================

pub fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().expect("valid socket address"),
        database_url: "postgres://unused".to_string(),
        log_level: tracing::Level::DEBUG,
        max_connections: 1,
        cors_origin: "http://localhost:5173".to_string(),
        session_ttl_days: 30,
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: Arc<InMemoryDb>,
    pub user_id: Uuid,
    pub token: String,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub set_cookie: Option<String>,
    pub body: Value,
}

impl TestApp {
    /// A router over an empty in-memory database with one signed-in user.
    pub fn new() -> Self {
        let db = Arc::new(InMemoryDb::default());
        let (user_id, token) = db.seed_user("reader@example.com");
        let state = Arc::new(AppState {
            db: db.clone(),
            config: Arc::new(test_config()),
        });
        Self {
            router: router(state),
            db,
            user_id,
            token,
        }
    }

    /// Sends a request carrying `token` as the session cookie.
    pub async fn send_as(
        &self,
        token: Option<&str>,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::COOKIE, format!("session={}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("valid request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("readable body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON body")
        };

        TestResponse {
            status,
            set_cookie,
            body,
        }
    }

    /// Sends a request as the seeded user.
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        self.send_as(Some(&self.token), method, uri, body).await
    }

    pub async fn create_book(&self, title: &str, total_pages: i32) -> Uuid {
        let id = Uuid::now_v7();
        let response = self
            .send(
                Method::POST,
                "/books",
                Some(serde_json::json!({
                    "id": id,
                    "title": title,
                    "totalPages": total_pages,
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        id
    }

    pub async fn create_run(&self, book_id: Uuid, completed_pages: i32) -> Uuid {
        let id = Uuid::now_v7();
        let response = self
            .send(
                Method::POST,
                "/reading-runs",
                Some(serde_json::json!({
                    "id": id,
                    "bookId": book_id,
                    "completedPages": completed_pages,
                    "startedAt": Utc::now(),
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        id
    }
}
