//! Bounded command execution
//!
//! Every command runs in a fresh process group under a wall-clock timeout:
//! - `sh -c` for command strings, or a direct argv spawn
//! - stdout/stderr captured concurrently up to a per-stream limit
//! - on timeout the whole group is SIGKILLed and partial output kept
//! - output is escaped before it leaves this module

mod background;
mod config;
pub mod process_group;
mod runner;
mod sanitize;


pub use background::{BackgroundExecutions, ExecutionSnapshot, ExecutionState};
pub use config::{
    ExecConfig, TimeoutBounds, BACKGROUND_MAX_TIMEOUT_SECS, DEFAULT_MAX_OUTPUT_BYTES,
    DEFAULT_SHELL, DEFAULT_TIMEOUT_SECS, MAX_TIMEOUT_SECS, MIN_TIMEOUT_SECS, TIMEOUT_EXIT_CODE,
};
pub use sanitize::escape_markup;

use crate::error::{Error, RejectReason, Result};
use crate::gate::ExecCapability;
use crate::path_guard::PathGuard;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use utoipa::ToSchema;

/// What to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    /// Interpreted by the configured shell
    Shell(String),
    /// Spawned directly, no shell involved
    Argv {
        /// Program name or path
        program: String,
        /// Arguments
        args: Vec<String>,
    },
}

impl CommandLine {
    /// Short form for logs.
    pub fn display(&self) -> String {
        match self {
            Self::Shell(s) => s.clone(),
            Self::Argv { program, args } => {
                let mut parts = vec![program.clone()];
                parts.extend(args.iter().cloned());
                parts.join(" ")
            }
        }
    }
}

/// A command execution request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    /// Command to run
    pub command: CommandLine,
    /// Working directory, validated through the path guard
    pub cwd: Option<String>,
    /// Requested timeout; clamped into the configured range
    pub timeout_secs: Option<u64>,
}

impl CommandRequest {
    /// Shell-mode request.
    pub fn shell(command: impl Into<String>) -> Self {
        Self {
            command: CommandLine::Shell(command.into()),
            cwd: None,
            timeout_secs: None,
        }
    }

    /// Argv-mode request.
    pub fn argv(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: CommandLine::Argv {
                program: program.into(),
                args,
            },
            cwd: None,
            timeout_secs: None,
        }
    }

    /// Set the working directory.
    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

/// How a command finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandStatus {
    /// Exited normally
    Exited {
        /// Exit code
        code: i32,
    },
    /// Killed by a signal it did not arrange itself
    Signaled {
        /// Signal number
        signal: i32,
    },
    /// Killed by the executor at the deadline
    TimedOut,
}

/// Captured, sanitized outcome of one command.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CommandResult {
    /// Escaped stdout
    pub stdout: String,
    /// Escaped stderr
    pub stderr: String,
    /// Final status
    pub status: CommandStatus,
    /// Whether stdout hit the capture limit
    pub stdout_truncated: bool,
    /// Whether stderr hit the capture limit
    pub stderr_truncated: bool,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

impl CommandResult {
    /// Shell-style exit code: 124 on timeout, 128+N when killed by signal N.
    pub fn exit_code(&self) -> i32 {
        match self.status {
            CommandStatus::Exited { code } => code,
            CommandStatus::Signaled { signal } => 128 + signal,
            CommandStatus::TimedOut => TIMEOUT_EXIT_CODE,
        }
    }

    /// Whether the executor killed the command.
    pub fn timed_out(&self) -> bool {
        matches!(self.status, CommandStatus::TimedOut)
    }

    /// Whether the command exited with code 0.
    pub fn success(&self) -> bool {
        matches!(self.status, CommandStatus::Exited { code: 0 })
    }
}

/// A request that passed validation.
#[derive(Debug, Clone)]
pub(crate) struct PreparedCommand {
    pub command: CommandLine,
    pub cwd: PathBuf,
    pub timeout: Duration,
}

/// Runs commands with bounded time and output.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    config: ExecConfig,
    guard: PathGuard,
}

impl CommandExecutor {
    /// Create an executor.
    pub fn new(config: ExecConfig, guard: PathGuard) -> Self {
        Self { config, guard }
    }

    /// Active configuration.
    pub fn config(&self) -> &ExecConfig {
        &self.config
    }

    /// Run a command to completion or timeout.
    pub async fn run(
        &self,
        _capability: &ExecCapability,
        request: CommandRequest,
    ) -> Result<CommandResult> {
        let prepared = self.prepare(request, self.config.foreground)?;
        self.run_prepared(prepared).await
    }

    pub(crate) fn prepare(
        &self,
        request: CommandRequest,
        bounds: TimeoutBounds,
    ) -> Result<PreparedCommand> {
        match &request.command {
            CommandLine::Shell(s) if s.trim().is_empty() => {
                return Err(Error::rejected_logged(RejectReason::InvalidCommand, "command is empty"))
            }
            CommandLine::Argv { program, .. } if program.trim().is_empty() => {
                return Err(Error::rejected_logged(RejectReason::InvalidCommand, "program is empty"))
            }
            _ => {}
        }
        let cwd = self.resolve_cwd(request.cwd.as_deref())?;
        Ok(PreparedCommand {
            command: request.command,
            cwd,
            timeout: bounds.effective(request.timeout_secs),
        })
    }

    fn resolve_cwd(&self, raw: Option<&str>) -> Result<PathBuf> {
        let cwd = match (raw, &self.config.default_cwd) {
            (Some(raw), _) => self.guard.resolve(raw)?,
            (None, Some(default)) => self.guard.resolve_path(default)?,
            (None, None) => self.guard.resolve_path(self.guard.base_dir())?,
        };
        match std::fs::metadata(&cwd) {
            Ok(meta) if meta.is_dir() => Ok(cwd),
            Ok(_) => Err(Error::rejected_logged(
                RejectReason::WrongKind,
                format!("'{}' is not a directory", cwd.display()),
            )),
            Err(e) => Err(Error::from_io(e, &cwd)),
        }
    }

    pub(crate) async fn run_prepared(&self, prepared: PreparedCommand) -> Result<CommandResult> {
        let shown = prepared.command.display();
        info!(
            command = %shown,
            cwd = %prepared.cwd.display(),
            timeout_secs = prepared.timeout.as_secs(),
            "Executing command"
        );

        let raw = runner::run_process(
            &self.config.shell,
            &prepared.command,
            &prepared.cwd,
            prepared.timeout,
            self.config.max_output_bytes,
            self.config.kill_grace,
        )
        .await?;

        let duration_ms = raw.elapsed.as_millis() as u64;
        match raw.status {
            CommandStatus::TimedOut => info!(
                command = %shown,
                timeout_secs = prepared.timeout.as_secs(),
                "Command timed out, process group killed"
            ),
            status => info!(command = %shown, ?status, duration_ms, "Command finished"),
        }
        if raw.stdout.omitted() > 0 || raw.stderr.omitted() > 0 {
            warn!(
                command = %shown,
                stdout_omitted = raw.stdout.omitted(),
                stderr_omitted = raw.stderr.omitted(),
                "Command output truncated"
            );
        }

        Ok(CommandResult {
            stdout: sanitize::sanitize_output(raw.stdout.data(), raw.stdout.omitted()),
            stderr: sanitize::sanitize_output(raw.stderr.data(), raw.stderr.omitted()),
            status: raw.status,
            stdout_truncated: raw.stdout.omitted() > 0,
            stderr_truncated: raw.stderr.omitted() > 0,
            duration_ms,
        })
    }
}
