pub mod auth;
pub mod books;
pub mod health;
pub mod middleware;
pub mod rest;
pub mod runs;
pub mod sessions;
pub mod state;
pub mod validate;

// Re-export what the binaries need to assemble the server.
pub use middleware::require_auth;
pub use rest::{router, ApiDoc};
pub use state::{AppState, AuthUser};
