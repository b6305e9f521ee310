//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Ownership is always part of the `WHERE` clause. Whether a row was found is
//! decided from what the statement itself returned or affected, never from a
//! separate lookup beforehand.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reading_tracker_core::domain::{
    Book, BookChanges, BookSummary, NewBook, NewReadingRun, NewReadingSession, ReadingRun,
    ReadingRunChanges, ReadingSession, ReadingSessionChanges, User, UserCredentials,
};
use reading_tracker_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use tracing::{debug, error, warn};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Translates a driver error. Constraint violations are the caller's fault
/// (bad input), everything else is unexpected.
fn map_db_error(e: sqlx::Error) -> PortError {
    if let sqlx::Error::Database(db_err) = &e {
        match db_err.code().as_deref() {
            Some("23505") => return PortError::Invalid("A record with the same key already exists".to_string()),
            Some("23514") | Some("23502") => {
                return PortError::Invalid(format!("Constraint violated: {}", db_err.message()))
            }
            Some("23503") => return PortError::NotFound("Referenced record".to_string()),
            _ => {}
        }
    }
    PortError::Unexpected(e.to_string())
}

/// A failed step of the finish transaction. The caller only learns that the
/// run could not be advanced; the driver error goes to the log.
fn finish_failure(step: &str, e: sqlx::Error) -> PortError {
    error!("Finishing a reading session failed at {}: {}", step, e);
    PortError::NotFound("Reading run".to_string())
}

/// Builds an `ILIKE` pattern matching `query` anywhere, with `%`, `_` and `\`
/// taken literally.
fn contains_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const BOOK_COLUMNS: &str = "id, user_id, title, author, description, language, isbn13, \
     publish_date, total_pages, created_at, updated_at, deleted_at";

const RUN_COLUMNS: &str =
    "id, book_id, user_id, completed_pages, started_at, finished_at, updated_at, deleted_at";

const SESSION_COLUMNS: &str = "id, run_id, user_id, start_page, end_page, read_pages, \
     start_time, end_time, read_time, updated_at, deleted_at";

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: String,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            email: self.email,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}

#[derive(FromRow)]
struct BookRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    author: Option<String>,
    description: Option<String>,
    language: Option<String>,
    isbn13: Option<String>,
    publish_date: Option<NaiveDate>,
    total_pages: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}
impl BookRecord {
    fn to_domain(self) -> Book {
        Book {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            author: self.author,
            description: self.description,
            language: self.language,
            isbn13: self.isbn13,
            publish_date: self.publish_date,
            total_pages: self.total_pages,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        }
    }
}

#[derive(FromRow)]
struct BookSummaryRecord {
    #[sqlx(flatten)]
    book: BookRecord,
    completed_pages: i32,
    last_activity_at: DateTime<Utc>,
}
impl BookSummaryRecord {
    fn to_domain(self) -> BookSummary {
        BookSummary {
            book: self.book.to_domain(),
            completed_pages: self.completed_pages,
            last_activity_at: self.last_activity_at,
        }
    }
}

#[derive(FromRow)]
struct RunRecord {
    id: Uuid,
    book_id: Uuid,
    user_id: Uuid,
    completed_pages: i32,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}
impl RunRecord {
    fn to_domain(self) -> ReadingRun {
        ReadingRun {
            id: self.id,
            book_id: self.book_id,
            user_id: self.user_id,
            completed_pages: self.completed_pages,
            started_at: self.started_at,
            finished_at: self.finished_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        }
    }
}

#[derive(FromRow)]
struct SessionRecord {
    id: Uuid,
    run_id: Uuid,
    user_id: Uuid,
    start_page: i32,
    end_page: i32,
    read_pages: i32,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    read_time: i32,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}
impl SessionRecord {
    fn to_domain(self) -> ReadingSession {
        ReadingSession {
            id: self.id,
            run_id: self.run_id,
            user_id: self.user_id,
            start_page: self.start_page,
            end_page: self.end_page,
            read_pages: self.read_pages,
            start_time: self.start_time,
            end_time: self.end_time,
            read_time: self.read_time,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn ping(&self) -> PortResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    // --- Auth ---

    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, email, hashed_password) VALUES ($1, $2, $3) \
             RETURNING user_id, email",
        )
        .bind(Uuid::now_v7())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match map_db_error(e) {
            PortError::Invalid(_) => PortError::Invalid("Email is already registered".to_string()),
            other => other,
        })?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| PortError::NotFound("User".to_string()))?;

        Ok(UserCredentials {
            user_id: record.user_id,
            email: record.email,
            hashed_password: record.hashed_password,
        })
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, email FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| PortError::NotFound("User".to_string()))?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let user_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;
        user_id.ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }

    // --- Books ---

    async fn list_books(
        &self,
        user_id: Uuid,
        query: Option<&str>,
    ) -> PortResult<Vec<BookSummary>> {
        let pattern = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(contains_pattern);

        // Progress comes from the latest run at read time; nothing is denormalized.
        let records = sqlx::query_as::<_, BookSummaryRecord>(
            "SELECT b.id, b.user_id, b.title, b.author, b.description, b.language, b.isbn13, \
                    b.publish_date, b.total_pages, b.created_at, b.updated_at, b.deleted_at, \
                    COALESCE(r.completed_pages, 0) AS completed_pages, \
                    COALESCE(r.updated_at, b.updated_at) AS last_activity_at \
             FROM book b \
             LEFT JOIN LATERAL ( \
                 SELECT completed_pages, updated_at FROM reading_run \
                 WHERE book_id = b.id AND deleted_at IS NULL \
                 ORDER BY started_at DESC, id DESC \
                 LIMIT 1 \
             ) r ON TRUE \
             WHERE b.user_id = $1 AND b.deleted_at IS NULL \
               AND ($2::text IS NULL OR b.title ILIKE $2 OR b.author ILIKE $2) \
             ORDER BY last_activity_at DESC, b.id DESC",
        )
        .bind(user_id)
        .bind(pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_book(&self, user_id: Uuid, book_id: Uuid) -> PortResult<Book> {
        let record = sqlx::query_as::<_, BookRecord>(&format!(
            "SELECT {BOOK_COLUMNS} FROM book \
             WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL"
        ))
        .bind(book_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| PortError::NotFound("Book".to_string()))?;
        Ok(record.to_domain())
    }

    async fn create_book(&self, user_id: Uuid, book: NewBook) -> PortResult<Book> {
        let record = sqlx::query_as::<_, BookRecord>(&format!(
            "INSERT INTO book (id, user_id, title, author, description, language, isbn13, \
                               publish_date, total_pages) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {BOOK_COLUMNS}"
        ))
        .bind(book.id)
        .bind(user_id)
        .bind(book.title)
        .bind(book.author)
        .bind(book.description)
        .bind(book.language)
        .bind(book.isbn)
        .bind(book.publish_date)
        .bind(book.total_pages)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;
        debug!("Created book {}", record.id);
        Ok(record.to_domain())
    }

    async fn update_book(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        changes: BookChanges,
    ) -> PortResult<Book> {
        let record = sqlx::query_as::<_, BookRecord>(&format!(
            "UPDATE book SET title = $3, author = $4, description = $5, language = $6, \
                             isbn13 = $7, publish_date = $8, total_pages = $9, \
                             updated_at = now() \
             WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL \
             RETURNING {BOOK_COLUMNS}"
        ))
        .bind(book_id)
        .bind(user_id)
        .bind(changes.title)
        .bind(changes.author)
        .bind(changes.description)
        .bind(changes.language)
        .bind(changes.isbn)
        .bind(changes.publish_date)
        .bind(changes.total_pages)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| PortError::NotFound("Book".to_string()))?;
        Ok(record.to_domain())
    }

    async fn delete_book(&self, user_id: Uuid, book_id: Uuid) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE book SET deleted_at = now(), updated_at = now() \
             WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL",
        )
        .bind(book_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound("Book".to_string()));
        }
        Ok(())
    }

    // --- Reading Runs ---

    async fn list_runs(&self, user_id: Uuid, book_id: Uuid) -> PortResult<Vec<ReadingRun>> {
        let records = sqlx::query_as::<_, RunRecord>(
            "SELECT r.id, r.book_id, r.user_id, r.completed_pages, r.started_at, \
                    r.finished_at, r.updated_at, r.deleted_at \
             FROM reading_run r \
             JOIN book b ON b.id = r.book_id AND b.deleted_at IS NULL \
             WHERE r.book_id = $1 AND r.user_id = $2 AND r.deleted_at IS NULL \
             ORDER BY r.started_at DESC, r.id DESC",
        )
        .bind(book_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn create_run(&self, user_id: Uuid, run: NewReadingRun) -> PortResult<ReadingRun> {
        // Inserting from the owned book row makes "book not found" and "not
        // your book" the same zero-row outcome.
        let record = sqlx::query_as::<_, RunRecord>(&format!(
            "INSERT INTO reading_run (id, book_id, user_id, completed_pages, started_at, updated_at) \
             SELECT $1, b.id, b.user_id, $4, $5, now() FROM book b \
             WHERE b.id = $2 AND b.user_id = $3 AND b.deleted_at IS NULL \
             RETURNING {RUN_COLUMNS}"
        ))
        .bind(run.id)
        .bind(run.book_id)
        .bind(user_id)
        .bind(run.completed_pages)
        .bind(run.started_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| PortError::NotFound("Book".to_string()))?;
        debug!("Created reading run {} for book {}", record.id, record.book_id);
        Ok(record.to_domain())
    }

    async fn update_run(
        &self,
        user_id: Uuid,
        run_id: Uuid,
        changes: ReadingRunChanges,
    ) -> PortResult<ReadingRun> {
        let record = sqlx::query_as::<_, RunRecord>(&format!(
            "UPDATE reading_run SET completed_pages = COALESCE($3, completed_pages), \
                                    finished_at = COALESCE($4, finished_at), \
                                    updated_at = now() \
             WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL \
             RETURNING {RUN_COLUMNS}"
        ))
        .bind(run_id)
        .bind(user_id)
        .bind(changes.completed_pages)
        .bind(changes.finished_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| PortError::NotFound("Reading run".to_string()))?;
        Ok(record.to_domain())
    }

    async fn delete_run(&self, user_id: Uuid, run_id: Uuid) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE reading_run SET deleted_at = now(), updated_at = now() \
             WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL",
        )
        .bind(run_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound("Reading run".to_string()));
        }
        Ok(())
    }

    // --- Reading Sessions ---

    async fn list_sessions(
        &self,
        user_id: Uuid,
        run_id: Uuid,
    ) -> PortResult<Vec<ReadingSession>> {
        let records = sqlx::query_as::<_, SessionRecord>(&format!(
            "SELECT {SESSION_COLUMNS} FROM reading_session \
             WHERE run_id = $1 AND user_id = $2 AND deleted_at IS NULL \
             ORDER BY start_time DESC, id DESC"
        ))
        .bind(run_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn finish_session(
        &self,
        user_id: Uuid,
        session: NewReadingSession,
    ) -> PortResult<ReadingSession> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| finish_failure("begin", e))?;

        // Reaching the last page also closes the run. An end page past the
        // book's last page matches no row.
        let updated = sqlx::query(
            "UPDATE reading_run AS r \
             SET completed_pages = $1, \
                 finished_at = CASE WHEN $1 = b.total_pages THEN $4 ELSE r.finished_at END, \
                 updated_at = now() \
             FROM book AS b \
             WHERE b.id = r.book_id AND r.id = $2 AND r.user_id = $3 AND r.deleted_at IS NULL \
               AND $1 <= b.total_pages",
        )
        .bind(session.end_page)
        .bind(session.run_id)
        .bind(user_id)
        .bind(session.end_time)
        .execute(&mut *tx)
        .await
        .map_err(|e| finish_failure("run update", e))?;

        if updated.rows_affected() == 0 {
            warn!(
                "Reading run {} not found for user {} (or end page {} out of range); rolling back",
                session.run_id, user_id, session.end_page
            );
            tx.rollback()
                .await
                .map_err(|e| finish_failure("rollback", e))?;
            return Err(PortError::NotFound("Reading run".to_string()));
        }

        // Dropping `tx` on an insert error rolls the run update back.
        let record = sqlx::query_as::<_, SessionRecord>(&format!(
            "INSERT INTO reading_session (id, run_id, user_id, start_page, end_page, read_pages, \
                                          start_time, end_time, read_time, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now()) \
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(session.id)
        .bind(session.run_id)
        .bind(user_id)
        .bind(session.start_page)
        .bind(session.end_page)
        .bind(session.read_pages())
        .bind(session.start_time)
        .bind(session.end_time)
        .bind(session.read_time)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| finish_failure("session insert", e))?;

        tx.commit()
            .await
            .map_err(|e| finish_failure("commit", e))?;
        debug!(
            "Recorded reading session {} on run {} ({} pages)",
            record.id, record.run_id, record.read_pages
        );
        Ok(record.to_domain())
    }

    async fn update_session(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        changes: ReadingSessionChanges,
    ) -> PortResult<ReadingSession> {
        // Right-hand sides see the old row, so read_pages is derived from the
        // resulting page range.
        let record = sqlx::query_as::<_, SessionRecord>(&format!(
            "UPDATE reading_session \
             SET start_page = COALESCE($3, start_page), \
                 end_page = COALESCE($4, end_page), \
                 read_pages = COALESCE($4, end_page) - COALESCE($3, start_page), \
                 start_time = COALESCE($5, start_time), \
                 end_time = COALESCE($6, end_time), \
                 read_time = COALESCE($7, read_time), \
                 updated_at = now() \
             WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL \
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(session_id)
        .bind(user_id)
        .bind(changes.start_page)
        .bind(changes.end_page)
        .bind(changes.start_time)
        .bind(changes.end_time)
        .bind(changes.read_time)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| PortError::NotFound("Reading session".to_string()))?;
        Ok(record.to_domain())
    }

    async fn delete_session(&self, user_id: Uuid, session_id: Uuid) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE reading_session SET deleted_at = now(), updated_at = now() \
             WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL",
        )
        .bind(session_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound("Reading session".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(contains_pattern("dune"), "%dune%");
        assert_eq!(contains_pattern("100%_sure\\"), "%100\\%\\_sure\\\\%");
    }

    async fn seed_user(pool: &PgPool) -> Uuid {
        let db = DbAdapter::new(pool.clone());
        db.create_user_with_email(&format!("{}@example.com", Uuid::new_v4()), "hash")
            .await
            .unwrap()
            .user_id
    }

    async fn seed_book(db: &DbAdapter, user_id: Uuid, total_pages: i32) -> Book {
        db.create_book(
            user_id,
            NewBook {
                id: Uuid::now_v7(),
                title: "The Name of the Rose".to_string(),
                total_pages,
                author: Some("Umberto Eco".to_string()),
                description: None,
                language: Some("it".to_string()),
                publish_date: None,
                isbn: None,
            },
        )
        .await
        .unwrap()
    }

    fn new_session(run_id: Uuid, start_page: i32, end_page: i32) -> NewReadingSession {
        let start_time = Utc::now() - Duration::minutes(10);
        NewReadingSession {
            id: Uuid::now_v7(),
            run_id,
            start_page,
            end_page,
            start_time,
            end_time: start_time + Duration::minutes(10),
            read_time: 600,
        }
    }

    async fn session_count(pool: &PgPool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM reading_session")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at a PostgreSQL server"]
    async fn finish_updates_run_and_inserts_session(pool: PgPool) {
        let db = DbAdapter::new(pool.clone());
        let user_id = seed_user(&pool).await;
        let book = seed_book(&db, user_id, 300).await;
        let run = db
            .create_run(
                user_id,
                NewReadingRun {
                    id: Uuid::now_v7(),
                    book_id: book.id,
                    completed_pages: 0,
                    started_at: Utc::now(),
                },
            )
            .await
            .unwrap();

        let session = db
            .finish_session(user_id, new_session(run.id, 0, 45))
            .await
            .unwrap();

        assert_eq!(session.read_pages, 45);
        assert_eq!(session.read_time, 600);
        let runs = db.list_runs(user_id, book.id).await.unwrap();
        assert_eq!(runs[0].completed_pages, 45);
        assert!(runs[0].finished_at.is_none());

        let books = db.list_books(user_id, None).await.unwrap();
        assert_eq!(books[0].completed_pages, 45);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at a PostgreSQL server"]
    async fn finish_on_unknown_run_writes_nothing(pool: PgPool) {
        let db = DbAdapter::new(pool.clone());
        let user_id = seed_user(&pool).await;

        let err = db
            .finish_session(user_id, new_session(Uuid::now_v7(), 0, 10))
            .await
            .unwrap_err();

        assert!(matches!(err, PortError::NotFound(_)));
        assert_eq!(session_count(&pool).await, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at a PostgreSQL server"]
    async fn failed_insert_rolls_back_the_run_update(pool: PgPool) {
        let db = DbAdapter::new(pool.clone());
        let user_id = seed_user(&pool).await;
        let book = seed_book(&db, user_id, 300).await;
        let run = db
            .create_run(
                user_id,
                NewReadingRun {
                    id: Uuid::now_v7(),
                    book_id: book.id,
                    completed_pages: 20,
                    started_at: Utc::now(),
                },
            )
            .await
            .unwrap();
        let first = db
            .finish_session(user_id, new_session(run.id, 20, 30))
            .await
            .unwrap();

        // Reusing the id violates the primary key after the run was updated.
        let mut duplicate = new_session(run.id, 30, 80);
        duplicate.id = first.id;
        let err = db.finish_session(user_id, duplicate).await.unwrap_err();

        assert!(matches!(err, PortError::NotFound(_)));
        let runs = db.list_runs(user_id, book.id).await.unwrap();
        assert_eq!(runs[0].completed_pages, 30);
        assert_eq!(session_count(&pool).await, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at a PostgreSQL server"]
    async fn finish_past_the_last_page_is_rejected(pool: PgPool) {
        let db = DbAdapter::new(pool.clone());
        let user_id = seed_user(&pool).await;
        let book = seed_book(&db, user_id, 100).await;
        let run = db
            .create_run(
                user_id,
                NewReadingRun {
                    id: Uuid::now_v7(),
                    book_id: book.id,
                    completed_pages: 90,
                    started_at: Utc::now(),
                },
            )
            .await
            .unwrap();

        let err = db
            .finish_session(user_id, new_session(run.id, 90, 101))
            .await
            .unwrap_err();

        assert!(matches!(err, PortError::NotFound(_)));
        let runs = db.list_runs(user_id, book.id).await.unwrap();
        assert_eq!(runs[0].completed_pages, 90);
        assert_eq!(session_count(&pool).await, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at a PostgreSQL server"]
    async fn other_users_rows_are_invisible(pool: PgPool) {
        let db = DbAdapter::new(pool.clone());
        let owner = seed_user(&pool).await;
        let stranger = seed_user(&pool).await;
        let book = seed_book(&db, owner, 120).await;

        assert!(matches!(
            db.get_book(stranger, book.id).await,
            Err(PortError::NotFound(_))
        ));
        assert!(matches!(
            db.delete_book(stranger, book.id).await,
            Err(PortError::NotFound(_))
        ));
        assert!(matches!(
            db.create_run(
                stranger,
                NewReadingRun {
                    id: Uuid::now_v7(),
                    book_id: book.id,
                    completed_pages: 0,
                    started_at: Utc::now(),
                },
            )
            .await,
            Err(PortError::NotFound(_))
        ));
        assert!(db.list_books(stranger, None).await.unwrap().is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at a PostgreSQL server"]
    async fn soft_deleted_books_disappear_from_listings(pool: PgPool) {
        let db = DbAdapter::new(pool.clone());
        let user_id = seed_user(&pool).await;
        let kept = seed_book(&db, user_id, 100).await;
        let dropped = seed_book(&db, user_id, 100).await;

        db.delete_book(user_id, dropped.id).await.unwrap();

        let books = db.list_books(user_id, Some("rose")).await.unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].book.id, kept.id);
        assert!(matches!(
            db.delete_book(user_id, dropped.id).await,
            Err(PortError::NotFound(_))
        ));
        let still_there: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book WHERE id = $1")
            .bind(dropped.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(still_there, 1);
    }
}
