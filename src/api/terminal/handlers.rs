use axum::{extract::Path, Extension, Json};
use shellgate_core::Scope;
use shellgate_tools::{CommandRequest, ExecutionSnapshot, PtyOutput, TimeoutBounds};
use uuid::Uuid;

use super::types::{
    ExecRequest, ExecResponse, ExecutionStarted, SessionInput, SessionSignal, SessionStarted,
    StartSessionRequest, TerminalStatus, ToggleRequest, ToggleResponse,
};
use crate::api::response::{ok, ApiError, ApiResult};
use crate::middleware::auth::{require_scope, RequireAuth};
use crate::middleware::gate::open_gate;
use crate::server::AppState;

/// Terminal feature state (any authenticated caller)
#[utoipa::path(
    get,
    path = "/api/v1/terminal/status",
    tag = "terminal",
    responses(
        (status = 200, description = "Feature state", body = TerminalStatus),
        (status = 401, description = "Unauthorized")
    ),
    security(("api_key" = []))
)]
pub async fn get_status(
    RequireAuth(_auth): RequireAuth,
    Extension(state): Extension<AppState>,
) -> ApiResult<TerminalStatus> {
    let bounds: TimeoutBounds = state.executor.config().foreground;
    ok(TerminalStatus {
        enabled: state.gate.is_enabled(),
        default_timeout_secs: bounds.default_secs,
        max_timeout_secs: bounds.max_secs,
        active_sessions: state.sessions.len().await,
        tracked_executions: state.executions.len().await,
    })
}

/// Turn the terminal feature on or off (requires feature_toggle scope)
#[utoipa::path(
    put,
    path = "/api/v1/terminal/enabled",
    tag = "terminal",
    request_body = ToggleRequest,
    responses(
        (status = 200, description = "New state", body = ToggleResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - missing FeatureToggle scope")
    ),
    security(("api_key" = []))
)]
pub async fn set_enabled(
    RequireAuth(auth): RequireAuth,
    Extension(state): Extension<AppState>,
    Json(request): Json<ToggleRequest>,
) -> ApiResult<ToggleResponse> {
    require_scope(&auth, Scope::FeatureToggle)?;
    let previous = state.gate.set_enabled(request.enabled);
    tracing::info!(user_id = %auth.user_id, enabled = request.enabled, "Terminal toggle requested");
    ok(ToggleResponse {
        enabled: request.enabled,
        previous,
    })
}

/// Run a command and wait for it (requires terminal_execute scope)
#[utoipa::path(
    post,
    path = "/api/v1/terminal/exec",
    tag = "terminal",
    request_body = ExecRequest,
    responses(
        (status = 200, description = "Command finished or timed out", body = ExecResponse),
        (status = 400, description = "Rejected request"),
        (status = 403, description = "Feature disabled or missing scope")
    ),
    security(("api_key" = []))
)]
pub async fn exec_command(
    RequireAuth(auth): RequireAuth,
    Extension(state): Extension<AppState>,
    Json(request): Json<ExecRequest>,
) -> ApiResult<ExecResponse> {
    let cap = open_gate(&state.gate, &auth, Scope::TerminalExecute)?;
    let request = CommandRequest::try_from(request)?;
    let result = state.executor.run(&cap, request).await?;
    ok(ExecResponse::from(result))
}

/// Start a background execution (requires terminal_execute scope)
#[utoipa::path(
    post,
    path = "/api/v1/terminal/executions",
    tag = "terminal",
    request_body = ExecRequest,
    responses(
        (status = 200, description = "Execution started", body = ExecutionStarted),
        (status = 400, description = "Rejected request"),
        (status = 403, description = "Feature disabled or missing scope")
    ),
    security(("api_key" = []))
)]
pub async fn start_execution(
    RequireAuth(auth): RequireAuth,
    Extension(state): Extension<AppState>,
    Json(request): Json<ExecRequest>,
) -> ApiResult<ExecutionStarted> {
    let cap = open_gate(&state.gate, &auth, Scope::TerminalExecute)?;
    let request = CommandRequest::try_from(request)?;
    let id = state.executions.start(&cap, request).await?;
    ok(ExecutionStarted { id })
}

/// Poll a background execution (requires terminal_execute scope)
#[utoipa::path(
    get,
    path = "/api/v1/terminal/executions/{id}",
    tag = "terminal",
    params(("id" = Uuid, Path, description = "Execution id")),
    responses(
        (status = 200, description = "Execution snapshot", body = ExecutionSnapshot),
        (status = 404, description = "Unknown or expired execution")
    ),
    security(("api_key" = []))
)]
pub async fn get_execution(
    RequireAuth(auth): RequireAuth,
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ExecutionSnapshot> {
    open_gate(&state.gate, &auth, Scope::TerminalExecute)?;
    match state.executions.status(id).await {
        Some(snapshot) => ok(snapshot),
        None => Err(ApiError::Tools(shellgate_tools::Error::NotFound(format!(
            "execution {}",
            id
        )))),
    }
}

/// Open a PTY session (requires terminal_execute scope)
#[utoipa::path(
    post,
    path = "/api/v1/terminal/sessions",
    tag = "terminal",
    request_body = StartSessionRequest,
    responses(
        (status = 200, description = "Session started", body = SessionStarted),
        (status = 400, description = "Rejected working directory"),
        (status = 404, description = "Working directory does not exist")
    ),
    security(("api_key" = []))
)]
pub async fn start_session(
    RequireAuth(auth): RequireAuth,
    Extension(state): Extension<AppState>,
    request: Option<Json<StartSessionRequest>>,
) -> ApiResult<SessionStarted> {
    let cap = open_gate(&state.gate, &auth, Scope::TerminalExecute)?;
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let session_id = state.sessions.start(&cap, request.cwd.as_deref()).await?;
    ok(SessionStarted { session_id })
}

/// Drain session output (requires terminal_execute scope)
#[utoipa::path(
    get,
    path = "/api/v1/terminal/sessions/{id}",
    tag = "terminal",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Output since the last read", body = PtyOutput),
        (status = 404, description = "Unknown session")
    ),
    security(("api_key" = []))
)]
pub async fn read_session(
    RequireAuth(auth): RequireAuth,
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
) -> ApiResult<PtyOutput> {
    open_gate(&state.gate, &auth, Scope::TerminalExecute)?;
    ok(state.sessions.read(&id).await?)
}

/// Send input to a session (requires terminal_execute scope)
#[utoipa::path(
    post,
    path = "/api/v1/terminal/sessions/{id}/input",
    tag = "terminal",
    params(("id" = String, Path, description = "Session id")),
    request_body = SessionInput,
    responses(
        (status = 200, description = "Input written"),
        (status = 404, description = "Unknown session")
    ),
    security(("api_key" = []))
)]
pub async fn write_session(
    RequireAuth(auth): RequireAuth,
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
    Json(input): Json<SessionInput>,
) -> ApiResult<()> {
    open_gate(&state.gate, &auth, Scope::TerminalExecute)?;
    state.sessions.write(&id, input.data.as_bytes()).await?;
    ok(())
}

/// Signal a session's process group (requires terminal_execute scope)
#[utoipa::path(
    post,
    path = "/api/v1/terminal/sessions/{id}/signal",
    tag = "terminal",
    params(("id" = String, Path, description = "Session id")),
    request_body = SessionSignal,
    responses(
        (status = 200, description = "Signal delivered"),
        (status = 404, description = "Unknown session")
    ),
    security(("api_key" = []))
)]
pub async fn signal_session(
    RequireAuth(auth): RequireAuth,
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SessionSignal>,
) -> ApiResult<()> {
    open_gate(&state.gate, &auth, Scope::TerminalExecute)?;
    state.sessions.signal(&id, request.signal).await?;
    ok(())
}

/// Close a session (requires terminal_execute scope)
#[utoipa::path(
    delete,
    path = "/api/v1/terminal/sessions/{id}",
    tag = "terminal",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session closed"),
        (status = 404, description = "Unknown session")
    ),
    security(("api_key" = []))
)]
pub async fn close_session(
    RequireAuth(auth): RequireAuth,
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    open_gate(&state.gate, &auth, Scope::TerminalExecute)?;
    state.sessions.close(&id).await?;
    ok(())
}
