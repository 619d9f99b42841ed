use serde::{Deserialize, Serialize};
use shellgate_tools::{CommandLine, CommandRequest, CommandResult, CommandStatus, PtySignal};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::response::ApiError;

/// Terminal feature state
#[derive(Debug, Serialize, ToSchema)]
pub struct TerminalStatus {
    pub enabled: bool,
    pub default_timeout_secs: u64,
    pub max_timeout_secs: u64,
    pub active_sessions: usize,
    pub tracked_executions: usize,
}

/// Toggle request
#[derive(Debug, Deserialize, ToSchema)]
pub struct ToggleRequest {
    pub enabled: bool,
}

/// Toggle result
#[derive(Debug, Serialize, ToSchema)]
pub struct ToggleResponse {
    pub enabled: bool,
    pub previous: bool,
}

/// Command to run. Give either `command` (shell) or `program` plus `args`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ExecRequest {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl TryFrom<ExecRequest> for CommandRequest {
    type Error = ApiError;

    fn try_from(req: ExecRequest) -> Result<Self, Self::Error> {
        let command = match (req.command, req.program) {
            (Some(command), None) => CommandLine::Shell(command),
            (None, Some(program)) => CommandLine::Argv {
                program,
                args: req.args,
            },
            (Some(_), Some(_)) => {
                return Err(ApiError::BadRequest(
                    "give either command or program, not both".to_string(),
                ))
            }
            (None, None) => {
                return Err(ApiError::BadRequest(
                    "command or program is required".to_string(),
                ))
            }
        };
        Ok(CommandRequest {
            command,
            cwd: req.cwd,
            timeout_secs: req.timeout_secs,
        })
    }
}

/// Result of a foreground command
#[derive(Debug, Serialize, ToSchema)]
pub struct ExecResponse {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub timed_out: bool,
    pub status: CommandStatus,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
    pub duration_ms: u64,
}

impl From<CommandResult> for ExecResponse {
    fn from(result: CommandResult) -> Self {
        Self {
            exit_code: result.exit_code(),
            timed_out: result.timed_out(),
            stdout: result.stdout,
            stderr: result.stderr,
            status: result.status,
            stdout_truncated: result.stdout_truncated,
            stderr_truncated: result.stderr_truncated,
            duration_ms: result.duration_ms,
        }
    }
}

/// Background execution handle
#[derive(Debug, Serialize, ToSchema)]
pub struct ExecutionStarted {
    pub id: Uuid,
}

/// New PTY session request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct StartSessionRequest {
    #[serde(default)]
    pub cwd: Option<String>,
}

/// PTY session handle
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionStarted {
    pub session_id: String,
}

/// Keystrokes for a session
#[derive(Debug, Deserialize, ToSchema)]
pub struct SessionInput {
    pub data: String,
}

/// Signal for a session
#[derive(Debug, Deserialize, ToSchema)]
pub struct SessionSignal {
    pub signal: PtySignal,
}
