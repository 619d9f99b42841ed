//! Web API module for Shellgate
//!
//! Provides REST API endpoints for:
//! - Terminal feature toggle and command execution
//! - PTY sessions
//! - File browsing
//! - Saved scripts
//! - API key administration

pub mod docs;
pub mod files;
pub mod health;
pub mod keys;
pub mod response;
pub mod scripts;
pub mod terminal;


use axum::Router;

pub use docs::docs_routes;
pub use files::files_routes;
pub use health::health_routes;
pub use keys::keys_routes;
pub use scripts::scripts_routes;
pub use terminal::terminal_routes;

/// Create the API router with all endpoints
pub fn api_router() -> Router {
    Router::new()
        .merge(health_routes())
        .merge(terminal_routes())
        .merge(files_routes())
        .merge(scripts_routes())
        .merge(keys_routes())
        .merge(docs_routes())
}
