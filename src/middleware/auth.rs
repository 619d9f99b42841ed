//! Authentication extractor for Axum
//!
//! Reads `Authorization: Bearer <key>` or `X-API-Key: <key>` and validates it
//! against the [`AuthStore`] installed as a request extension.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use shellgate_core::auth::{AuthContext, AuthError, AuthStore, Scope};
use std::sync::Arc;

use crate::api::response::ApiResponse;

/// Auth rejection type, rendered in the standard error envelope
#[derive(Debug)]
pub struct AuthRejection {
    status: StatusCode,
    message: String,
    code: &'static str,
}

impl AuthRejection {
    /// HTTP status of the rejection.
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ApiResponse::<()>::error(self.message, self.code)),
        )
            .into_response()
    }
}

impl From<AuthError> for AuthRejection {
    fn from(err: AuthError) -> Self {
        let (status, code) = match &err {
            AuthError::MissingCredentials => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            AuthError::TokenRevoked => (StatusCode::UNAUTHORIZED, "TOKEN_REVOKED"),
            AuthError::UnknownKey(_) => (StatusCode::NOT_FOUND, "E_NOT_FOUND"),
            AuthError::InsufficientScope { .. } => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AuthError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };
        let message = match err {
            AuthError::MissingCredentials => {
                "Authentication required. Provide Authorization: Bearer <key> or X-API-Key header."
                    .to_string()
            }
            AuthError::InsufficientScope { required } => {
                format!("Missing scope: {}", required)
            }
            AuthError::Internal(detail) => {
                tracing::error!(error = %detail, "Auth failure");
                "internal error".to_string()
            }
            other => other.to_string(),
        };
        AuthRejection {
            status,
            message,
            code,
        }
    }
}

/// Axum extractor that requires a valid API key.
pub struct RequireAuth(pub AuthContext);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let auth_store = parts
            .extensions
            .get::<Arc<AuthStore>>()
            .ok_or_else(|| AuthError::Internal("AuthStore not configured".to_string()))?;

        if !auth_store.is_enabled() {
            return Ok(RequireAuth(auth_store.validate_token("")?));
        }

        let token = extract_token(parts)?;
        let ctx = auth_store.validate_token(&token)?;
        Ok(RequireAuth(ctx))
    }
}

fn extract_token(parts: &Parts) -> std::result::Result<String, AuthError> {
    if let Some(value) = parts
        .headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
    {
        if let Some(token) = value.strip_prefix("Bearer ") {
            return Ok(token.trim().to_string());
        }
    }

    if let Some(value) = parts
        .headers
        .get("x-api-key")
        .and_then(|h| h.to_str().ok())
    {
        return Ok(value.trim().to_string());
    }

    Err(AuthError::MissingCredentials)
}

/// Check a scope requirement inside a handler.
pub fn require_scope(auth: &AuthContext, scope: Scope) -> std::result::Result<(), AuthRejection> {
    auth.require_scope(scope).map_err(AuthRejection::from)
}
