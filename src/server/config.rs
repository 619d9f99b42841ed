//! Server configuration types

use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub terminal: TerminalConfig,
    #[serde(default)]
    pub scripts: ScriptsConfig,
    #[serde(default)]
    pub files: FilesConfig,
}

/// HTTP listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            auth: AuthConfig::default(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Require an API key on every API route
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Command execution and PTY sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Initial state of the feature gate
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_shell")]
    pub shell: String,
    #[serde(default = "default_pty_shell")]
    pub pty_shell: String,
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,
    #[serde(default = "default_max_timeout_secs")]
    pub max_timeout_secs: u64,
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    #[serde(default = "default_execution_retention_secs")]
    pub execution_retention_secs: u64,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            shell: default_shell(),
            pty_shell: default_pty_shell(),
            default_timeout_secs: default_timeout_secs(),
            max_timeout_secs: default_max_timeout_secs(),
            max_output_bytes: default_max_output_bytes(),
            session_ttl_secs: default_session_ttl_secs(),
            execution_retention_secs: default_execution_retention_secs(),
        }
    }
}

fn default_shell() -> String {
    shellgate_tools::exec::DEFAULT_SHELL.to_string()
}

fn default_pty_shell() -> String {
    shellgate_tools::pty::DEFAULT_PTY_SHELL.to_string()
}

fn default_timeout_secs() -> u64 {
    shellgate_tools::exec::DEFAULT_TIMEOUT_SECS
}

fn default_max_timeout_secs() -> u64 {
    shellgate_tools::exec::MAX_TIMEOUT_SECS
}

fn default_max_output_bytes() -> usize {
    shellgate_tools::exec::DEFAULT_MAX_OUTPUT_BYTES
}

fn default_session_ttl_secs() -> u64 {
    shellgate_tools::pty::DEFAULT_SESSION_TTL_SECS
}

fn default_execution_retention_secs() -> u64 {
    300
}

/// Script store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptsConfig {
    #[serde(default = "default_script_root")]
    pub root: String,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            root: default_script_root(),
        }
    }
}

fn default_script_root() -> String {
    "/scripts".to_string()
}

/// File browser
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesConfig {
    /// Anchor for relative paths; home directory when unset
    #[serde(default)]
    pub base_dir: Option<String>,
    #[serde(default = "default_max_read_bytes")]
    pub max_read_bytes: u64,
    /// Additional denied subtrees on top of the built-in list
    #[serde(default)]
    pub extra_denied_roots: Vec<String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            max_read_bytes: default_max_read_bytes(),
            extra_denied_roots: Vec::new(),
        }
    }
}

fn default_max_read_bytes() -> u64 {
    shellgate_tools::files::DEFAULT_MAX_READ_BYTES
}

fn default_true() -> bool {
    true
}
