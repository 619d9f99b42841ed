//! File browser API endpoints
//!
//! GET    /api/v1/files/list?path=       - List a directory
//! GET    /api/v1/files/content?path=    - Read a file
//! PUT    /api/v1/files/content          - Write a file
//! DELETE /api/v1/files/content?path=    - Delete a file
//! POST   /api/v1/files/directory        - Create a directory
//! DELETE /api/v1/files/directory?path=  - Delete a directory tree

use axum::{
    extract::Query,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use shellgate_core::Scope;
use shellgate_tools::{DeleteOutcome, DirectoryEntry};
use utoipa::{IntoParams, ToSchema};

use crate::api::response::{ok, ApiResult};
use crate::middleware::auth::RequireAuth;
use crate::middleware::gate::open_gate;
use crate::server::AppState;

/// Target path
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PathQuery {
    pub path: String,
}

/// File content, decoded lossily as UTF-8
#[derive(Debug, Serialize, ToSchema)]
pub struct FileContent {
    pub path: String,
    pub content: String,
    pub size: usize,
}

/// Write request
#[derive(Debug, Deserialize, ToSchema)]
pub struct WriteFileRequest {
    pub path: String,
    pub content: String,
}

/// Directory creation request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDirectoryRequest {
    pub path: String,
}

/// List a directory (requires files_read scope)
#[utoipa::path(
    get,
    path = "/api/v1/files/list",
    tag = "files",
    params(PathQuery),
    responses(
        (status = 200, description = "Entries sorted by name", body = Vec<DirectoryEntry>),
        (status = 400, description = "Rejected path or not a directory"),
        (status = 403, description = "Feature disabled or missing scope"),
        (status = 404, description = "Directory does not exist")
    ),
    security(("api_key" = []))
)]
pub async fn list_directory(
    RequireAuth(auth): RequireAuth,
    Extension(state): Extension<AppState>,
    Query(query): Query<PathQuery>,
) -> ApiResult<Vec<DirectoryEntry>> {
    open_gate(&state.gate, &auth, Scope::FilesRead)?;
    ok(state.files.list_directory(&query.path).await?)
}

/// Read a file (requires files_read scope)
#[utoipa::path(
    get,
    path = "/api/v1/files/content",
    tag = "files",
    params(PathQuery),
    responses(
        (status = 200, description = "File content", body = FileContent),
        (status = 404, description = "File does not exist"),
        (status = 413, description = "File exceeds the read limit")
    ),
    security(("api_key" = []))
)]
pub async fn read_file(
    RequireAuth(auth): RequireAuth,
    Extension(state): Extension<AppState>,
    Query(query): Query<PathQuery>,
) -> ApiResult<FileContent> {
    open_gate(&state.gate, &auth, Scope::FilesRead)?;
    let bytes = state.files.read_file(&query.path).await?;
    ok(FileContent {
        size: bytes.len(),
        content: String::from_utf8_lossy(&bytes).into_owned(),
        path: query.path,
    })
}

/// Write a file atomically (requires files_write scope)
#[utoipa::path(
    put,
    path = "/api/v1/files/content",
    tag = "files",
    request_body = WriteFileRequest,
    responses(
        (status = 200, description = "File written"),
        (status = 400, description = "Rejected path")
    ),
    security(("api_key" = []))
)]
pub async fn write_file(
    RequireAuth(auth): RequireAuth,
    Extension(state): Extension<AppState>,
    Json(request): Json<WriteFileRequest>,
) -> ApiResult<()> {
    open_gate(&state.gate, &auth, Scope::FilesWrite)?;
    state
        .files
        .write_file(&request.path, request.content.as_bytes())
        .await?;
    ok(())
}

/// Delete a file (requires files_write scope)
#[utoipa::path(
    delete,
    path = "/api/v1/files/content",
    tag = "files",
    params(PathQuery),
    responses(
        (status = 200, description = "File deleted"),
        (status = 400, description = "Rejected path or a directory"),
        (status = 404, description = "File does not exist")
    ),
    security(("api_key" = []))
)]
pub async fn delete_file(
    RequireAuth(auth): RequireAuth,
    Extension(state): Extension<AppState>,
    Query(query): Query<PathQuery>,
) -> ApiResult<()> {
    open_gate(&state.gate, &auth, Scope::FilesWrite)?;
    state.files.delete_file(&query.path).await?;
    ok(())
}

/// Create a directory and its parents (requires files_write scope)
#[utoipa::path(
    post,
    path = "/api/v1/files/directory",
    tag = "files",
    request_body = CreateDirectoryRequest,
    responses(
        (status = 200, description = "Directory exists"),
        (status = 400, description = "Rejected path")
    ),
    security(("api_key" = []))
)]
pub async fn create_directory(
    RequireAuth(auth): RequireAuth,
    Extension(state): Extension<AppState>,
    Json(request): Json<CreateDirectoryRequest>,
) -> ApiResult<()> {
    open_gate(&state.gate, &auth, Scope::FilesWrite)?;
    state.files.create_directory(&request.path).await?;
    ok(())
}

/// Delete a directory tree (requires files_write scope)
#[utoipa::path(
    delete,
    path = "/api/v1/files/directory",
    tag = "files",
    params(PathQuery),
    responses(
        (status = 200, description = "Deleted, possibly partially", body = DeleteOutcome),
        (status = 400, description = "Rejected path or a denylisted entry inside the tree"),
        (status = 404, description = "Directory does not exist")
    ),
    security(("api_key" = []))
)]
pub async fn delete_directory(
    RequireAuth(auth): RequireAuth,
    Extension(state): Extension<AppState>,
    Query(query): Query<PathQuery>,
) -> ApiResult<DeleteOutcome> {
    open_gate(&state.gate, &auth, Scope::FilesWrite)?;
    ok(state.files.delete_directory_recursive(&query.path).await?)
}

/// Create file routes
pub fn files_routes() -> Router {
    Router::new()
        .route("/api/v1/files/list", get(list_directory))
        .route(
            "/api/v1/files/content",
            get(read_file).put(write_file).delete(delete_file),
        )
        .route(
            "/api/v1/files/directory",
            post(create_directory).delete(delete_directory),
        )
}
