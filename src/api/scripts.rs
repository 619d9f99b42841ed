//! Script store API endpoints
//!
//! GET    /api/v1/scripts            - List scripts
//! GET    /api/v1/scripts/:name      - Read a script
//! PUT    /api/v1/scripts/:name      - Create or replace a script
//! DELETE /api/v1/scripts/:name      - Delete a script
//! POST   /api/v1/scripts/:name/run  - Run a script in the background

use axum::{
    extract::Path,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use shellgate_core::Scope;
use shellgate_tools::{CommandRequest, ScriptInfo};
use tracing::info;
use utoipa::ToSchema;

use super::terminal::ExecutionStarted;
use crate::api::response::{ok, ApiResult};
use crate::middleware::auth::RequireAuth;
use crate::middleware::gate::open_gate;
use crate::server::AppState;

/// Script body
#[derive(Debug, Serialize, ToSchema)]
pub struct ScriptContent {
    pub name: String,
    pub content: String,
}

/// Create or replace request
#[derive(Debug, Deserialize, ToSchema)]
pub struct SaveScriptRequest {
    pub content: String,
    #[serde(default)]
    pub description: String,
    /// 5-field cron expression, empty for none
    #[serde(default)]
    pub schedule: String,
}

/// Run options
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RunScriptRequest {
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// List scripts (requires scripts_read scope)
#[utoipa::path(
    get,
    path = "/api/v1/scripts",
    tag = "scripts",
    responses(
        (status = 200, description = "Scripts ordered by name", body = Vec<ScriptInfo>),
        (status = 403, description = "Feature disabled or missing scope")
    ),
    security(("api_key" = []))
)]
pub async fn list_scripts(
    RequireAuth(auth): RequireAuth,
    Extension(state): Extension<AppState>,
) -> ApiResult<Vec<ScriptInfo>> {
    open_gate(&state.gate, &auth, Scope::ScriptsRead)?;
    ok(state.scripts.list().await?)
}

/// Read a script (requires scripts_read scope)
#[utoipa::path(
    get,
    path = "/api/v1/scripts/{name}",
    tag = "scripts",
    params(("name" = String, Path, description = "Script file name, e.g. backup.sh")),
    responses(
        (status = 200, description = "Script body", body = ScriptContent),
        (status = 400, description = "Invalid name"),
        (status = 404, description = "No such script")
    ),
    security(("api_key" = []))
)]
pub async fn get_script(
    RequireAuth(auth): RequireAuth,
    Extension(state): Extension<AppState>,
    Path(name): Path<String>,
) -> ApiResult<ScriptContent> {
    open_gate(&state.gate, &auth, Scope::ScriptsRead)?;
    let content = state.scripts.read(&name).await?;
    ok(ScriptContent { name, content })
}

/// Create or replace a script (requires scripts_write scope)
#[utoipa::path(
    put,
    path = "/api/v1/scripts/{name}",
    tag = "scripts",
    params(("name" = String, Path, description = "Script file name, e.g. backup.sh")),
    request_body = SaveScriptRequest,
    responses(
        (status = 200, description = "Saved script", body = ScriptInfo),
        (status = 400, description = "Invalid name or schedule")
    ),
    security(("api_key" = []))
)]
pub async fn save_script(
    RequireAuth(auth): RequireAuth,
    Extension(state): Extension<AppState>,
    Path(name): Path<String>,
    Json(request): Json<SaveScriptRequest>,
) -> ApiResult<ScriptInfo> {
    open_gate(&state.gate, &auth, Scope::ScriptsWrite)?;
    let saved = state
        .scripts
        .save(&name, &request.content, &request.description, &request.schedule)
        .await?;
    ok(saved)
}

/// Delete a script (requires scripts_write scope)
#[utoipa::path(
    delete,
    path = "/api/v1/scripts/{name}",
    tag = "scripts",
    params(("name" = String, Path, description = "Script file name, e.g. backup.sh")),
    responses(
        (status = 200, description = "Script deleted"),
        (status = 404, description = "No such script")
    ),
    security(("api_key" = []))
)]
pub async fn delete_script(
    RequireAuth(auth): RequireAuth,
    Extension(state): Extension<AppState>,
    Path(name): Path<String>,
) -> ApiResult<()> {
    open_gate(&state.gate, &auth, Scope::ScriptsWrite)?;
    state.scripts.delete(&name).await?;
    ok(())
}

/// Run a saved script as a background execution (requires terminal_execute scope)
#[utoipa::path(
    post,
    path = "/api/v1/scripts/{name}/run",
    tag = "scripts",
    params(("name" = String, Path, description = "Script file name, e.g. backup.sh")),
    request_body = RunScriptRequest,
    responses(
        (status = 200, description = "Execution started", body = ExecutionStarted),
        (status = 404, description = "No such script")
    ),
    security(("api_key" = []))
)]
pub async fn run_script(
    RequireAuth(auth): RequireAuth,
    Extension(state): Extension<AppState>,
    Path(name): Path<String>,
    request: Option<Json<RunScriptRequest>>,
) -> ApiResult<ExecutionStarted> {
    let cap = open_gate(&state.gate, &auth, Scope::TerminalExecute)?;
    let request = request.map(|Json(r)| r).unwrap_or_default();

    let path = state.scripts.script_path(&name).await?;
    let cwd = path
        .parent()
        .unwrap_or_else(|| state.scripts.root())
        .display()
        .to_string();
    let mut command = CommandRequest::argv(path.display().to_string(), Vec::new()).with_cwd(cwd);
    command.timeout_secs = request.timeout_secs;

    let id = state.executions.start(&cap, command).await?;
    info!(script = %name, exec_id = %id, user_id = %auth.user_id, "Script run started");
    ok(ExecutionStarted { id })
}

/// Create script routes
pub fn scripts_routes() -> Router {
    Router::new()
        .route("/api/v1/scripts", get(list_scripts))
        .route(
            "/api/v1/scripts/:name",
            get(get_script).put(save_script).delete(delete_script),
        )
        .route("/api/v1/scripts/:name/run", post(run_script))
}
