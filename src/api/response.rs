//! Response envelope and error mapping shared by all handlers

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shellgate_tools::Error as ToolsError;
use tracing::error;

use crate::middleware::auth::AuthRejection;

/// Standard API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    pub fn error(message: impl Into<String>, code: impl Into<String>) -> ApiResponse<T> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.into()),
            code: Some(code.into()),
        }
    }
}

/// Handler result type
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Wrap `data` in a success envelope.
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

/// Every way a handler can fail.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or insufficient credentials
    Auth(AuthRejection),
    /// Runtime error
    Tools(ToolsError),
    /// Malformed request that never reached the runtime
    BadRequest(String),
}

impl From<AuthRejection> for ApiError {
    fn from(rejection: AuthRejection) -> Self {
        Self::Auth(rejection)
    }
}

impl From<ToolsError> for ApiError {
    fn from(err: ToolsError) -> Self {
        Self::Tools(err)
    }
}

/// HTTP status for a runtime error.
pub fn status_for(err: &ToolsError) -> StatusCode {
    match err {
        ToolsError::Rejected { .. } => StatusCode::BAD_REQUEST,
        ToolsError::NotFound(_) => StatusCode::NOT_FOUND,
        ToolsError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        ToolsError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        ToolsError::Unavailable(_) => StatusCode::FORBIDDEN,
        ToolsError::Execution(_) | ToolsError::Io(_) | ToolsError::Serialization(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Auth(rejection) => rejection.into_response(),
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<()>::error(message, "E_BAD_REQUEST")),
            )
                .into_response(),
            ApiError::Tools(err) => {
                if err.is_internal() {
                    error!(error = %err, "Request failed");
                }
                let code = match &err {
                    ToolsError::Unavailable(_) => "FEATURE_DISABLED",
                    other => other.code(),
                };
                (
                    status_for(&err),
                    Json(ApiResponse::<()>::error(err.public_message(), code)),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shellgate_tools::RejectReason;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&ToolsError::rejected(RejectReason::Denylisted, "x")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&ToolsError::NotFound("x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&ToolsError::TooLarge { size: 2, limit: 1 }),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            status_for(&ToolsError::Unavailable("off".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_for(&ToolsError::Execution("spawn".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let response =
            ApiError::Tools(ToolsError::Execution("fork failed in /secret".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "internal error");
        assert_eq!(json["code"], "E_INTERNAL");
        assert_eq!(json["success"], false);
    }

    #[test]
    fn test_success_envelope_omits_error_fields() {
        let json = serde_json::to_value(ApiResponse::success(5)).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "data": 5}));
    }
}
