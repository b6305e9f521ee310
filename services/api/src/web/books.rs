//! services/api/src/web/books.rs
//!
//! Handlers for `/books`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use reading_tracker_core::domain::{Book, BookChanges, BookSummary, NewBook};
use reading_tracker_core::isbn::{strip_isbn, to_isbn13};
use reading_tracker_core::progress::{progress_percent, BookStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{ApiError, ErrorBody};
use crate::web::state::{AppState, AuthUser};
use crate::web::validate::{field_error, normalize_optional, not_blank, parse_id, ValidJson};

//=========================================================================================
// Payloads
//=========================================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    /// Client generated id (UUIDv7 recommended).
    pub id: Uuid,
    #[validate(custom(function = "not_blank"))]
    pub title: String,
    #[validate(range(min = 1, message = "Must be greater than 0"))]
    pub total_pages: i32,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// ISO 639-1 code, e.g. `en`.
    #[serde(default)]
    #[validate(custom(function = "language_code"))]
    pub language: Option<String>,
    #[serde(default)]
    pub publish_date: Option<NaiveDate>,
    /// ISBN-13 or ISBN-10; spaces and hyphens are ignored and ISBN-10 is
    /// stored converted.
    #[serde(default)]
    #[validate(custom(function = "valid_isbn"))]
    pub isbn: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookRequest {
    #[validate(custom(function = "not_blank"))]
    pub title: String,
    #[validate(range(min = 1, message = "Must be greater than 0"))]
    pub total_pages: i32,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "language_code"))]
    pub language: Option<String>,
    #[serde(default)]
    pub publish_date: Option<NaiveDate>,
    #[serde(default)]
    #[validate(custom(function = "valid_isbn"))]
    pub isbn: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BooksParams {
    pub q: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookResponse {
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

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            user_id: book.user_id,
            title: book.title,
            author: book.author,
            description: book.description,
            language: book.language,
            isbn13: book.isbn13,
            publish_date: book.publish_date,
            total_pages: book.total_pages,
            created_at: book.created_at,
            updated_at: book.updated_at,
            deleted_at: book.deleted_at,
        }
    }
}

/// A book in the list view, with the progress of its latest reading run.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookSummaryResponse {
    #[serde(flatten)]
    pub book: BookResponse,
    pub completed_pages: i32,
    pub last_activity_at: DateTime<Utc>,
    #[schema(value_type = String, example = "in-progress")]
    pub status: BookStatus,
    pub progress_percent: u32,
}

impl From<BookSummary> for BookSummaryResponse {
    fn from(summary: BookSummary) -> Self {
        let total_pages = summary.book.total_pages;
        Self {
            status: BookStatus::from_pages(summary.completed_pages, total_pages),
            progress_percent: progress_percent(summary.completed_pages, total_pages),
            book: summary.book.into(),
            completed_pages: summary.completed_pages,
            last_activity_at: summary.last_activity_at,
        }
    }
}

//=========================================================================================
// Validation
//=========================================================================================

/// Blank is allowed and stored as null.
fn language_code(language: &str) -> Result<(), ValidationError> {
    let language = language.trim();
    if language.is_empty()
        || (language.len() == 2 && language.chars().all(|c| c.is_ascii_alphabetic()))
    {
        return Ok(());
    }
    Err(field_error("language", "Must be a two-letter language code"))
}

/// Blank is allowed; anything else must carry a valid checksum.
fn valid_isbn(isbn: &str) -> Result<(), ValidationError> {
    if strip_isbn(isbn).is_empty() || to_isbn13(isbn).is_some() {
        return Ok(());
    }
    Err(field_error("isbn", "Invalid ISBN"))
}

fn normalize_language(language: Option<String>) -> Option<String> {
    normalize_optional(language).map(|l| l.to_ascii_lowercase())
}

/// Runs after validation, so anything left is convertible.
fn normalize_isbn(isbn: Option<String>) -> Option<String> {
    isbn.as_deref().and_then(to_isbn13)
}

impl CreateBookRequest {
    fn into_domain(self) -> NewBook {
        NewBook {
            id: self.id,
            title: self.title.trim().to_string(),
            total_pages: self.total_pages,
            author: normalize_optional(self.author),
            description: normalize_optional(self.description),
            language: normalize_language(self.language),
            publish_date: self.publish_date,
            isbn: normalize_isbn(self.isbn),
        }
    }
}

impl UpdateBookRequest {
    fn into_domain(self) -> BookChanges {
        BookChanges {
            title: self.title.trim().to_string(),
            total_pages: self.total_pages,
            author: normalize_optional(self.author),
            description: normalize_optional(self.description),
            language: normalize_language(self.language),
            publish_date: self.publish_date,
            isbn: normalize_isbn(self.isbn),
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// List the caller's books, most recently read first.
#[utoipa::path(
    get,
    path = "/books",
    params(
        ("q" = Option<String>, Query, description = "Case-insensitive substring of title or author.")
    ),
    responses(
        (status = 200, description = "Books with progress of their latest run", body = [BookSummaryResponse]),
        (status = 401, description = "Not signed in", body = ErrorBody)
    ),
    tag = "books"
)]
pub async fn list_books_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<BooksParams>,
) -> Result<Json<Vec<BookSummaryResponse>>, ApiError> {
    let books = state
        .db
        .list_books(auth.user_id, params.q.as_deref())
        .await?;
    Ok(Json(books.into_iter().map(Into::into).collect()))
}

/// Get a single book.
#[utoipa::path(
    get,
    path = "/books/{bookId}",
    params(("bookId" = Uuid, Path, description = "Book id")),
    responses(
        (status = 200, description = "The book", body = BookResponse),
        (status = 404, description = "Absent or not owned", body = ErrorBody)
    ),
    tag = "books"
)]
pub async fn get_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(book_id): Path<String>,
) -> Result<Json<BookResponse>, ApiError> {
    let book_id = parse_id("param.bookId", Some(&book_id))?;
    let book = state.db.get_book(auth.user_id, book_id).await?;
    Ok(Json(book.into()))
}

/// Register a book.
#[utoipa::path(
    post,
    path = "/books",
    request_body = CreateBookRequest,
    responses(
        (status = 201, description = "Book created", body = BookResponse),
        (status = 400, description = "Invalid payload", body = ErrorBody)
    ),
    tag = "books"
)]
pub async fn create_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(req): ValidJson<CreateBookRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let book = state.db.create_book(auth.user_id, req.into_domain()).await?;
    info!("User {} added book {}", auth.user_id, book.id);
    Ok((StatusCode::CREATED, Json(BookResponse::from(book))))
}

/// Replace a book's details.
#[utoipa::path(
    put,
    path = "/books/{bookId}",
    params(("bookId" = Uuid, Path, description = "Book id")),
    request_body = UpdateBookRequest,
    responses(
        (status = 200, description = "Book updated", body = BookResponse),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 404, description = "Absent or not owned", body = ErrorBody)
    ),
    tag = "books"
)]
pub async fn update_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(book_id): Path<String>,
    ValidJson(req): ValidJson<UpdateBookRequest>,
) -> Result<Json<BookResponse>, ApiError> {
    let book_id = parse_id("param.bookId", Some(&book_id))?;
    let book = state
        .db
        .update_book(auth.user_id, book_id, req.into_domain())
        .await?;
    Ok(Json(book.into()))
}

/// Soft-delete a book.
#[utoipa::path(
    delete,
    path = "/books/{bookId}",
    params(("bookId" = Uuid, Path, description = "Book id")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Absent or not owned", body = ErrorBody)
    ),
    tag = "books"
)]
pub async fn delete_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(book_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let book_id = parse_id("param.bookId", Some(&book_id))?;
    state.db.delete_book(auth.user_id, book_id).await?;
    info!("User {} deleted book {}", auth.user_id, book_id);
    Ok(StatusCode::NO_CONTENT)
}
