//! API Documentation
//!
//! Serves the OpenAPI document at /api/openapi.json

use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

use super::{
    files::{CreateDirectoryRequest, FileContent, WriteFileRequest},
    keys::{CreateKeyRequest, CreatedKey, KeyView},
    scripts::{RunScriptRequest, SaveScriptRequest, ScriptContent},
    terminal::{
        ExecRequest, ExecResponse, ExecutionStarted, SessionInput, SessionSignal, SessionStarted,
        StartSessionRequest, TerminalStatus, ToggleRequest, ToggleResponse,
    },
};
use shellgate_tools::{
    exec::ExecutionState, CommandStatus, DeleteFailure, DeleteOutcome, DirectoryEntry, EntryKind,
    ExecutionSnapshot, PtyOutput, PtySignal, ScriptInfo,
};

/// Shellgate API OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Shellgate API",
        version = "1.0.0",
        description = "Sandboxed command execution and file access.

## Overview
- **Terminal**: Feature toggle, one-shot and background commands, PTY sessions
- **Files**: Browse and edit files outside the protected system trees
- **Scripts**: Saved shell scripts with optional cron schedules

Everything except the status, toggle and key endpoints answers `403 FEATURE_DISABLED`
while the terminal feature is off.

## Authentication
Send an API key in the `Authorization` header or `X-API-Key`:
```
Authorization: Bearer <api_key>
```
"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Terminal
        crate::api::terminal::handlers::get_status,
        crate::api::terminal::handlers::set_enabled,
        crate::api::terminal::handlers::exec_command,
        crate::api::terminal::handlers::start_execution,
        crate::api::terminal::handlers::get_execution,
        crate::api::terminal::handlers::start_session,
        crate::api::terminal::handlers::read_session,
        crate::api::terminal::handlers::write_session,
        crate::api::terminal::handlers::signal_session,
        crate::api::terminal::handlers::close_session,
        // Files
        crate::api::files::list_directory,
        crate::api::files::read_file,
        crate::api::files::write_file,
        crate::api::files::delete_file,
        crate::api::files::create_directory,
        crate::api::files::delete_directory,
        // Scripts
        crate::api::scripts::list_scripts,
        crate::api::scripts::get_script,
        crate::api::scripts::save_script,
        crate::api::scripts::delete_script,
        crate::api::scripts::run_script,
        // Keys
        crate::api::keys::list_keys,
        crate::api::keys::create_key,
        crate::api::keys::revoke_key,
    ),
    components(
        schemas(
            // Terminal
            TerminalStatus,
            ToggleRequest,
            ToggleResponse,
            ExecRequest,
            ExecResponse,
            ExecutionStarted,
            ExecutionSnapshot,
            ExecutionState,
            CommandStatus,
            StartSessionRequest,
            SessionStarted,
            SessionInput,
            SessionSignal,
            PtySignal,
            PtyOutput,
            // Files
            DirectoryEntry,
            EntryKind,
            FileContent,
            WriteFileRequest,
            CreateDirectoryRequest,
            DeleteOutcome,
            DeleteFailure,
            // Scripts
            ScriptInfo,
            ScriptContent,
            SaveScriptRequest,
            RunScriptRequest,
            // Keys
            KeyView,
            CreateKeyRequest,
            CreatedKey,
        )
    ),
    tags(
        (name = "terminal", description = "Command execution and PTY sessions"),
        (name = "files", description = "Guarded file browser"),
        (name = "scripts", description = "Saved scripts"),
        (name = "keys", description = "API key administration"),
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Create documentation routes
pub fn docs_routes() -> Router {
    Router::new().route("/api/openapi.json", get(openapi_json))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_area() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| p.as_str() == "/api/v1/terminal/exec"));
        assert!(paths.iter().any(|p| p.as_str() == "/api/v1/files/list"));
        assert!(paths.iter().any(|p| p.as_str() == "/api/v1/scripts/{name}/run"));
        assert!(paths.iter().any(|p| p.as_str() == "/api/v1/keys/{key_hash}"));
    }
}
