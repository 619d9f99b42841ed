//! Terminal API endpoints
//!
//! GET    /api/v1/terminal/status                - Feature state
//! PUT    /api/v1/terminal/enabled               - Toggle the feature
//! POST   /api/v1/terminal/exec                  - Run a command and wait
//! POST   /api/v1/terminal/executions            - Start a background execution
//! GET    /api/v1/terminal/executions/:id        - Poll a background execution
//! POST   /api/v1/terminal/sessions              - Open a PTY session
//! GET    /api/v1/terminal/sessions/:id          - Drain session output
//! POST   /api/v1/terminal/sessions/:id/input    - Send keystrokes
//! POST   /api/v1/terminal/sessions/:id/signal   - Signal the session
//! DELETE /api/v1/terminal/sessions/:id          - Close the session

pub mod handlers;
pub mod types;

pub use handlers::{
    close_session, exec_command, get_execution, get_status, read_session, set_enabled,
    signal_session, start_execution, start_session, write_session,
};
pub use types::{
    ExecRequest, ExecResponse, ExecutionStarted, SessionInput, SessionSignal, SessionStarted,
    StartSessionRequest, TerminalStatus, ToggleRequest, ToggleResponse,
};

use axum::{
    routing::{get, post, put},
    Router,
};

/// Create terminal routes
pub fn terminal_routes() -> Router {
    Router::new()
        .route("/api/v1/terminal/status", get(get_status))
        .route("/api/v1/terminal/enabled", put(set_enabled))
        .route("/api/v1/terminal/exec", post(exec_command))
        .route("/api/v1/terminal/executions", post(start_execution))
        .route("/api/v1/terminal/executions/:id", get(get_execution))
        .route("/api/v1/terminal/sessions", post(start_session))
        .route(
            "/api/v1/terminal/sessions/:id",
            get(read_session).delete(close_session),
        )
        .route("/api/v1/terminal/sessions/:id/input", post(write_session))
        .route("/api/v1/terminal/sessions/:id/signal", post(signal_session))
}
