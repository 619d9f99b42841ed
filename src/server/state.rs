//! Shared runtime handed to every handler

use super::config::AppConfig;
use shellgate_tools::exec::TimeoutBounds;
use shellgate_tools::{
    BackgroundExecutions, CommandExecutor, Denylist, ExecConfig, FeatureGate, FileBrowser,
    PathGuard, PtySessions, ScriptStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Runtime components, cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    pub gate: Arc<FeatureGate>,
    pub executor: CommandExecutor,
    pub executions: BackgroundExecutions,
    pub sessions: PtySessions,
    pub scripts: ScriptStore,
    pub files: FileBrowser,
}

impl AppState {
    /// Wire the runtime from configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        let guard = path_guard(config);

        let terminal = &config.terminal;
        let exec_config = ExecConfig {
            shell: PathBuf::from(&terminal.shell),
            foreground: TimeoutBounds {
                default_secs: terminal.default_timeout_secs,
                max_secs: terminal.max_timeout_secs,
                ..TimeoutBounds::FOREGROUND
            },
            max_output_bytes: terminal.max_output_bytes,
            ..ExecConfig::default()
        };
        let executor = CommandExecutor::new(exec_config, guard.clone());
        let executions = BackgroundExecutions::new(
            executor.clone(),
            Duration::from_secs(terminal.execution_retention_secs),
        );
        let sessions = PtySessions::new(guard.clone())
            .with_shell(&terminal.pty_shell)
            .with_ttl(Duration::from_secs(terminal.session_ttl_secs));

        Self {
            gate: Arc::new(FeatureGate::new(terminal.enabled)),
            executor,
            executions,
            sessions,
            scripts: ScriptStore::new(&config.scripts.root, guard.clone()),
            files: FileBrowser::new(guard).with_max_read_bytes(config.files.max_read_bytes),
        }
    }
}

/// Path guard with the built-in denylist plus configured extra roots.
pub fn path_guard(config: &AppConfig) -> PathGuard {
    let denylist =
        Denylist::standard().with_extra_subtrees(config.files.extra_denied_roots.iter());
    let guard = PathGuard::new(denylist);
    match &config.files.base_dir {
        Some(base) => guard.with_base_dir(base),
        None => guard,
    }
}
