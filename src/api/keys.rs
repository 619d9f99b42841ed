//! API key administration (admin scope)
//!
//! GET    /api/v1/keys            - List keys without secrets
//! POST   /api/v1/keys            - Mint a key, returned once
//! DELETE /api/v1/keys/:key_hash  - Revoke a key
//!
//! Keys live in memory, so these routes are the only way to manage them on
//! a running server. They are not behind the terminal feature gate.

use axum::{
    extract::Path,
    routing::{delete, get},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use shellgate_core::{ApiKeyInfo, AuthStore, Scope};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

use crate::api::response::{ok, ApiError, ApiResult};
use crate::middleware::auth::{require_scope, AuthRejection, RequireAuth};

/// Key listing entry
#[derive(Debug, Serialize, ToSchema)]
pub struct KeyView {
    /// Revocation handle
    pub key_hash: String,
    pub user_id: String,
    pub label: String,
    #[schema(value_type = Vec<String>)]
    pub scopes: Vec<Scope>,
    pub created_at: DateTime<Utc>,
    pub revoked: bool,
}

impl From<ApiKeyInfo> for KeyView {
    fn from(info: ApiKeyInfo) -> Self {
        Self {
            key_hash: info.key_hash,
            user_id: info.user_id,
            label: info.label,
            scopes: info.scopes,
            created_at: info.created_at,
            revoked: info.revoked,
        }
    }
}

/// Mint request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateKeyRequest {
    pub user_id: String,
    #[serde(default)]
    pub label: String,
    /// e.g. `["terminal_execute", "files_read"]`
    #[schema(value_type = Vec<String>)]
    pub scopes: Vec<Scope>,
}

/// A freshly minted key. `key` is not stored and cannot be shown again.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedKey {
    pub key: String,
    pub key_hash: String,
}

fn auth_error(err: shellgate_core::AuthError) -> ApiError {
    ApiError::Auth(AuthRejection::from(err))
}

/// List API keys (requires admin scope)
#[utoipa::path(
    get,
    path = "/api/v1/keys",
    tag = "keys",
    responses(
        (status = 200, description = "Keys, oldest first", body = Vec<KeyView>),
        (status = 403, description = "Missing admin scope")
    ),
    security(("api_key" = []))
)]
pub async fn list_keys(
    RequireAuth(auth): RequireAuth,
    Extension(store): Extension<Arc<AuthStore>>,
) -> ApiResult<Vec<KeyView>> {
    require_scope(&auth, Scope::Admin)?;
    let keys = store.list_keys().map_err(auth_error)?;
    ok(keys.into_iter().map(KeyView::from).collect())
}

/// Mint an API key (requires admin scope)
#[utoipa::path(
    post,
    path = "/api/v1/keys",
    tag = "keys",
    request_body = CreateKeyRequest,
    responses(
        (status = 200, description = "Key created", body = CreatedKey),
        (status = 400, description = "Missing user or scopes"),
        (status = 403, description = "Missing admin scope")
    ),
    security(("api_key" = []))
)]
pub async fn create_key(
    RequireAuth(auth): RequireAuth,
    Extension(store): Extension<Arc<AuthStore>>,
    Json(request): Json<CreateKeyRequest>,
) -> ApiResult<CreatedKey> {
    require_scope(&auth, Scope::Admin)?;
    if request.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("user_id is required".to_string()));
    }
    if request.scopes.is_empty() {
        return Err(ApiError::BadRequest("at least one scope is required".to_string()));
    }

    let (key, key_hash) = store
        .generate_api_key(request.user_id.trim(), request.scopes, &request.label)
        .map_err(auth_error)?;
    info!(issued_by = %auth.user_id, key_hash = %key_hash, "API key issued");
    ok(CreatedKey {
        key: key.expose_secret().to_string(),
        key_hash,
    })
}

/// Revoke an API key (requires admin scope)
#[utoipa::path(
    delete,
    path = "/api/v1/keys/{key_hash}",
    tag = "keys",
    params(("key_hash" = String, Path, description = "Hash from the key listing")),
    responses(
        (status = 200, description = "Key revoked"),
        (status = 404, description = "No such key")
    ),
    security(("api_key" = []))
)]
pub async fn revoke_key(
    RequireAuth(auth): RequireAuth,
    Extension(store): Extension<Arc<AuthStore>>,
    Path(key_hash): Path<String>,
) -> ApiResult<()> {
    require_scope(&auth, Scope::Admin)?;
    store.revoke_key(&key_hash).map_err(auth_error)?;
    info!(revoked_by = %auth.user_id, key_hash = %key_hash, "API key revoked via API");
    ok(())
}

/// Create key administration routes
pub fn keys_routes() -> Router {
    Router::new()
        .route("/api/v1/keys", get(list_keys).post(create_key))
        .route("/api/v1/keys/:key_hash", delete(revoke_key))
}
