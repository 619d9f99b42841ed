//! Configuration loading
//!
//! Embedded defaults, then `config/local.toml`, then `SHELLGATE_*`
//! environment variables.

use super::config::AppConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use tracing::info;

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../../config/default.toml");

/// Older deployments set the script directory through this variable.
pub const LEGACY_SCRIPT_DIR_VAR: &str = "BASH_TERMINAL_SCRIPT_DIR";

/// Load configuration from files and environment
pub fn load_config() -> Result<AppConfig> {
    let config = Config::builder()
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        .add_source(File::with_name("config/local").required(false))
        // SHELLGATE_SERVER__PORT, not SHELLGATE__SERVER__PORT
        .add_source(
            Environment::with_prefix("SHELLGATE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut app: AppConfig = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;
    apply_legacy_env(&mut app, std::env::var(LEGACY_SCRIPT_DIR_VAR).ok());
    Ok(app)
}

fn apply_legacy_env(app: &mut AppConfig, script_dir: Option<String>) {
    if let Some(dir) = script_dir.filter(|d| !d.trim().is_empty()) {
        info!(root = %dir, "Script root taken from {}", LEGACY_SCRIPT_DIR_VAR);
        app.scripts.root = dir;
    }
}
