//! Shellgate Core - authentication and process lifecycle
//!
//! - Auth: API keys, scopes and constant-time validation
//! - Shutdown: coordinated graceful shutdown

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod shutdown;

pub use auth::{
    admin_scopes, operator_scopes, ApiKeyInfo, AuthContext, AuthError, AuthStore, Scope,
};
pub use shutdown::{
    wait_for_shutdown_signal, ShutdownController, ShutdownPhase, ShutdownSignal, TaskGuard,
};
