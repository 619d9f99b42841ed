//! Startup configuration checks

use super::config::AppConfig;
use super::state::path_guard;
use anyhow::{bail, Result};
use std::path::Path;
use tracing::warn;

/// Reject unusable settings and warn about risky ones.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let terminal = &config.terminal;
    if terminal.default_timeout_secs == 0 || terminal.max_timeout_secs == 0 {
        bail!("terminal timeouts must be at least one second");
    }
    if terminal.default_timeout_secs > terminal.max_timeout_secs {
        bail!(
            "terminal.default_timeout_secs ({}) exceeds terminal.max_timeout_secs ({})",
            terminal.default_timeout_secs,
            terminal.max_timeout_secs
        );
    }
    if terminal.max_output_bytes == 0 {
        bail!("terminal.max_output_bytes must be positive");
    }
    if !Path::new(&config.scripts.root).is_absolute() {
        bail!("scripts.root must be an absolute path");
    }
    if let Some(base) = &config.files.base_dir {
        if !Path::new(base).is_absolute() {
            bail!("files.base_dir must be an absolute path");
        }
        if let Err(e) = path_guard(config).check_absolute(Path::new(base)) {
            bail!("files.base_dir is not allowed: {}", e);
        }
    }

    let loopback = matches!(config.server.host.as_str(), "127.0.0.1" | "::1" | "localhost");
    if !config.server.auth.enabled && !loopback {
        warn!(
            host = %config.server.host,
            "SECURITY WARNING: Authentication is DISABLED while the server is exposed. \
             Anyone who can reach it can run commands once the terminal is enabled."
        );
    }
    if terminal.enabled {
        warn!("Terminal feature is enabled at startup");
    }

    Ok(())
}
