//! Server initialization and main run loop

use super::config::AppConfig;
use super::loader::load_config;
use super::state::AppState;
use super::validation::validate_config;
use anyhow::{Context, Result};
use axum::{routing::get, Extension, Router};
use secrecy::ExposeSecret;
use shellgate_core::{admin_scopes, wait_for_shutdown_signal, AuthStore, ShutdownController};
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

/// Operator-supplied admin key
pub const API_KEY_ENV: &str = "SHELLGATE_API_KEY";

const SESSION_REAP_INTERVAL: Duration = Duration::from_secs(60);
const EXECUTION_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Run the server
pub async fn run() -> Result<()> {
    info!("Starting Shellgate v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config().context("Failed to load configuration")?;
    info!("Configuration loaded");

    validate_config(&config)?;

    let auth_store = init_auth(&config);
    let state = AppState::from_config(&config);
    info!(
        terminal_enabled = state.gate.is_enabled(),
        scripts_root = %state.scripts.root().display(),
        "Runtime initialized"
    );

    let shutdown_controller = ShutdownController::new();
    let reaper = state.sessions.spawn_reaper(SESSION_REAP_INTERVAL);
    let pruner = spawn_execution_pruner(&state, &shutdown_controller);

    let app = build_router(state.clone(), auth_store)
        .route("/", get(|| async { "Shellgate" }));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            wait_for_shutdown_signal().await;
        })
        .await
        .context("HTTP server error")?;

    shutdown_controller.shutdown().await;
    reaper.abort();
    if let Err(e) = pruner.await {
        warn!(error = %e, "Execution pruner ended abnormally");
    }

    let closed = state.sessions.close_all().await;
    if closed > 0 {
        info!(closed, "Closed PTY sessions");
    }

    info!("Shellgate shutdown complete");
    Ok(())
}

/// Attach every route and the shared layers to `state`.
pub fn build_router(state: AppState, auth_store: Arc<AuthStore>) -> Router {
    crate::api::api_router()
        .layer(Extension(state))
        .layer(Extension(auth_store))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Build the auth store. With auth enabled, an admin key is taken from
/// `SHELLGATE_API_KEY` or generated. A generated key goes to stderr once;
/// logs only carry its prefix.
pub fn init_auth(config: &AppConfig) -> Arc<AuthStore> {
    init_auth_with(config, std::env::var(API_KEY_ENV).ok(), &mut std::io::stderr())
}

fn init_auth_with(
    config: &AppConfig,
    env_key: Option<String>,
    console: &mut dyn Write,
) -> Arc<AuthStore> {
    let auth_enabled = config.server.auth.enabled;
    let auth_store = Arc::new(AuthStore::new(auth_enabled));

    if !auth_enabled {
        warn!("SECURITY: Authentication disabled, all API endpoints are open (development only). Set [server.auth] enabled = true for production.");
        return auth_store;
    }

    match env_key {
        Some(key) if !key.trim().is_empty() => {
            match auth_store.register_key(key.trim(), "admin", admin_scopes(), "environment") {
                Ok(_) => info!("Admin API key loaded from {}", API_KEY_ENV),
                Err(e) => warn!("Failed to register API key from {}: {}", API_KEY_ENV, e),
            }
        }
        _ => match auth_store.generate_api_key("admin", admin_scopes(), "auto-generated admin key") {
            Ok((key, _hash)) => {
                let printed = writeln!(
                    console,
                    "\nAuto-generated admin API key (shown once, set {} to keep a fixed key):\n  {}\n",
                    API_KEY_ENV,
                    key.expose_secret()
                );
                if let Err(e) = printed {
                    warn!(error = %e, "Could not print the generated admin key");
                }
            }
            Err(e) => {
                warn!("Failed to auto-generate API key: {}", e);
            }
        },
    }

    info!("Authentication ENABLED - API key required for all endpoints");
    auth_store
}

fn spawn_execution_pruner(
    state: &AppState,
    controller: &Arc<ShutdownController>,
) -> JoinHandle<()> {
    let executions = state.executions.clone();
    let guard = controller.register_task();
    let token = controller.token();
    tokio::spawn(async move {
        let _guard = guard;
        let mut ticker = tokio::time::interval(EXECUTION_PRUNE_INTERVAL);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    executions.prune().await;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pruner_stops_on_shutdown() {
        let state = AppState::from_config(&AppConfig::default());
        let controller = ShutdownController::with_timeout(Duration::from_secs(2));
        let handle = spawn_execution_pruner(&state, &controller);
        assert_eq!(controller.active_task_count(), 1);

        controller.shutdown().await;
        handle.await.unwrap();
        assert_eq!(controller.active_task_count(), 0);
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<std::sync::Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[test]
    fn test_generated_key_stays_out_of_logs() {
        let logs = Captured::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let mut console = Vec::new();
        let store = tracing::subscriber::with_default(subscriber, || {
            init_auth_with(&AppConfig::default(), None, &mut console)
        });

        let console = String::from_utf8(console).unwrap();
        let key = console
            .split_whitespace()
            .find(|word| word.starts_with(shellgate_core::auth::KEY_PREFIX))
            .expect("key printed to console");
        assert!(store.validate_token(key).is_ok());

        let logs = logs.text();
        assert!(!logs.contains(key), "full key leaked into logs");
        assert!(logs.contains(&key[..10]), "prefix missing from logs: {logs}");
    }

    #[test]
    fn test_env_key_is_registered_silently() {
        let mut console = Vec::new();
        let store = init_auth_with(
            &AppConfig::default(),
            Some(" sg_from_env ".to_string()),
            &mut console,
        );
        assert!(console.is_empty());
        assert!(store.validate_token("sg_from_env").is_ok());
    }

    #[test]
    fn test_disabled_auth_generates_no_key() {
        let mut config = AppConfig::default();
        config.server.auth.enabled = false;
        let store = init_auth(&config);
        assert!(!store.is_enabled());
        assert_eq!(store.active_key_count(), 0);
    }
}
