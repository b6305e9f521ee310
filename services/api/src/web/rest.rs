//! services/api/src/web/rest.rs
//!
//! Builds the REST router and holds the master definition for the OpenAPI
//! specification.

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;
use utoipa::OpenApi;

use crate::error::ErrorBody;
use crate::web::{auth, books, health, middleware::require_auth, runs, sessions, state::AppState};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        health::healthz_handler,
        health::readyz_handler,
        books::list_books_handler,
        books::get_book_handler,
        books::create_book_handler,
        books::update_book_handler,
        books::delete_book_handler,
        runs::list_runs_handler,
        runs::create_run_handler,
        runs::update_run_handler,
        runs::delete_run_handler,
        sessions::list_sessions_handler,
        sessions::create_session_handler,
        sessions::update_session_handler,
        sessions::delete_session_handler,
    ),
    components(
        schemas(
            ErrorBody,
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            health::HealthStatus,
            books::CreateBookRequest,
            books::UpdateBookRequest,
            books::BookResponse,
            books::BookSummaryResponse,
            runs::CreateRunRequest,
            runs::UpdateRunRequest,
            runs::RunResponse,
            sessions::CreateSessionRequest,
            sessions::UpdateSessionRequest,
            sessions::SessionResponse,
        )
    ),
    tags(
        (name = "books", description = "The caller's library."),
        (name = "reading-runs", description = "Read-throughs of a book."),
        (name = "reading-sessions", description = "Timed sittings within a run."),
        (name = "auth", description = "Cookie based sign in."),
        (name = "health", description = "Liveness and readiness.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Router
//=========================================================================================

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    match origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(e) => {
            warn!("Ignoring CORS_ORIGIN '{}': {}", origin, e);
            cors
        }
    }
}

/// The complete API router, without the Swagger UI.
pub fn router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/healthz", get(health::healthz_handler))
        .route("/readyz", get(health::readyz_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/me", get(auth::me_handler))
        .route(
            "/books",
            get(books::list_books_handler).post(books::create_book_handler),
        )
        .route(
            "/books/{bookId}",
            get(books::get_book_handler)
                .put(books::update_book_handler)
                .delete(books::delete_book_handler),
        )
        .route(
            "/reading-runs",
            get(runs::list_runs_handler).post(runs::create_run_handler),
        )
        .route(
            "/reading-runs/{runId}",
            put(runs::update_run_handler).delete(runs::delete_run_handler),
        )
        .route(
            "/reading-sessions",
            get(sessions::list_sessions_handler).post(sessions::create_session_handler),
        )
        .route(
            "/reading-sessions/{sessionId}",
            put(sessions::update_session_handler)
                .delete(sessions::delete_session_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors_layer(&state.config.cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
