//! Health check endpoints.
//!
//! Provides:
//! - `/health`: "healthy" + version (for load balancers)
//! - `/health/detailed`: per-component status (terminal, scripts, sessions)

use axum::extract::Extension;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Serialize;

use crate::middleware::auth::RequireAuth;
use crate::server::AppState;

/// Simple health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Detailed health response with per-component checks
#[derive(Debug, Serialize)]
pub struct DetailedHealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub checks: HealthChecks,
}

/// All component health checks
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub terminal: ComponentHealth,
    pub scripts: ComponentHealth,
    pub sessions: ComponentHealth,
}

/// Individual component health status
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ComponentHealth {
    fn healthy_with_details(details: serde_json::Value) -> Self {
        Self {
            status: "healthy",
            error: None,
            details: Some(details),
        }
    }

    fn disabled() -> Self {
        Self {
            status: "disabled",
            error: None,
            details: None,
        }
    }

    fn unhealthy(error: String) -> Self {
        Self {
            status: "unhealthy",
            error: Some(error),
            details: None,
        }
    }
}

/// Simple health check (for load balancers)
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Detailed health check (requires authentication)
async fn detailed_health_check(
    RequireAuth(_auth): RequireAuth,
    Extension(state): Extension<AppState>,
) -> Json<DetailedHealthResponse> {
    let terminal = if state.gate.is_enabled() {
        ComponentHealth::healthy_with_details(serde_json::json!({
            "tracked_executions": state.executions.len().await,
        }))
    } else {
        ComponentHealth::disabled()
    };
    let scripts = check_scripts(&state).await;
    let sessions = ComponentHealth::healthy_with_details(serde_json::json!({
        "active": state.sessions.len().await,
    }));

    let overall_status = overall([terminal.status, scripts.status, sessions.status]);

    Json(DetailedHealthResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION"),
        checks: HealthChecks {
            terminal,
            scripts,
            sessions,
        },
    })
}

/// Check that the script store can enumerate its root
async fn check_scripts(state: &AppState) -> ComponentHealth {
    match state.scripts.list().await {
        Ok(scripts) => ComponentHealth::healthy_with_details(serde_json::json!({
            "root": state.scripts.root().display().to_string(),
            "count": scripts.len(),
        })),
        Err(e) => ComponentHealth::unhealthy(e.public_message()),
    }
}

fn overall(components: [&'static str; 3]) -> &'static str {
    let healthy_count = components.iter().filter(|s| **s != "unhealthy").count();
    if healthy_count == components.len() {
        "healthy"
    } else if healthy_count > 0 {
        "degraded"
    } else {
        "unhealthy"
    }
}

/// Create health routes
pub fn health_routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/detailed", get(detailed_health_check))
}
