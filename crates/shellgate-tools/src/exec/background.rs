//! Detached executions that callers poll for status.

use super::{CommandExecutor, CommandRequest, CommandResult};
use crate::error::Result;
use crate::gate::ExecCapability;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error, info};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle of a background execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    /// Still running
    Running,
    /// Exited with code 0
    Completed,
    /// Exited non-zero, was signalled, or could not run
    Failed,
    /// Killed at the deadline
    Timeout,
}

/// Point-in-time view of a background execution.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExecutionSnapshot {
    /// Execution id
    pub id: Uuid,
    /// Current state
    pub status: ExecutionState,
    /// Command as submitted
    pub command: String,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// Seconds since start, or total runtime once finished
    pub elapsed_secs: f64,
    /// Escaped stdout, empty while running
    pub stdout: String,
    /// Escaped stderr, empty while running
    pub stderr: String,
    /// Exit code once finished
    pub exit_code: Option<i32>,
    /// Failure detail when the command could not run
    pub error: Option<String>,
}

#[derive(Debug)]
struct Entry {
    command: String,
    started_at: DateTime<Utc>,
    started: Instant,
    finished: Option<Instant>,
    outcome: Option<std::result::Result<CommandResult, String>>,
}

impl Entry {
    fn snapshot(&self, id: Uuid) -> ExecutionSnapshot {
        let elapsed = self
            .finished
            .unwrap_or_else(Instant::now)
            .duration_since(self.started)
            .as_secs_f64();
        let mut snap = ExecutionSnapshot {
            id,
            status: ExecutionState::Running,
            command: self.command.clone(),
            started_at: self.started_at,
            elapsed_secs: (elapsed * 10.0).round() / 10.0,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            error: None,
        };
        match &self.outcome {
            None => {}
            Some(Ok(result)) => {
                snap.status = if result.timed_out() {
                    ExecutionState::Timeout
                } else if result.success() {
                    ExecutionState::Completed
                } else {
                    ExecutionState::Failed
                };
                snap.stdout = result.stdout.clone();
                snap.stderr = result.stderr.clone();
                snap.exit_code = Some(result.exit_code());
            }
            Some(Err(message)) => {
                snap.status = ExecutionState::Failed;
                snap.error = Some(message.clone());
            }
        }
        snap
    }
}

/// Registry of background executions. Finished entries are dropped once
/// they are older than the retention period.
#[derive(Debug, Clone)]
pub struct BackgroundExecutions {
    executor: CommandExecutor,
    entries: Arc<RwLock<HashMap<Uuid, Entry>>>,
    retention: Duration,
}

impl BackgroundExecutions {
    /// Create a registry.
    pub fn new(executor: CommandExecutor, retention: Duration) -> Self {
        Self {
            executor,
            entries: Arc::new(RwLock::new(HashMap::new())),
            retention,
        }
    }

    /// Validate and start `request`; returns its id immediately.
    pub async fn start(&self, _capability: &ExecCapability, request: CommandRequest) -> Result<Uuid> {
        self.prune().await;

        let prepared = self
            .executor
            .prepare(request, self.executor.config().background)?;
        let id = Uuid::new_v4();
        let command = prepared.command.display();

        self.entries.write().await.insert(
            id,
            Entry {
                command: command.clone(),
                started_at: Utc::now(),
                started: Instant::now(),
                finished: None,
                outcome: None,
            },
        );
        info!(exec_id = %id, command = %command, "Background execution started");

        let executor = self.executor.clone();
        let entries = self.entries.clone();
        tokio::spawn(async move {
            let outcome = executor.run_prepared(prepared).await.map_err(|e| {
                error!(exec_id = %id, error = %e, "Background execution failed");
                e.public_message()
            });
            if let Some(entry) = entries.write().await.get_mut(&id) {
                entry.finished = Some(Instant::now());
                entry.outcome = Some(outcome);
            }
            debug!(exec_id = %id, "Background execution recorded");
        });

        Ok(id)
    }

    /// Current view of an execution.
    pub async fn status(&self, id: Uuid) -> Option<ExecutionSnapshot> {
        self.entries.read().await.get(&id).map(|e| e.snapshot(id))
    }

    /// Drop finished entries older than the retention period. Returns how
    /// many were removed.
    pub async fn prune(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        let retention = self.retention;
        entries.retain(|_, e| match e.finished {
            Some(at) => at.elapsed() < retention,
            None => true,
        });
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "Pruned finished background executions");
        }
        removed
    }

    /// Number of tracked executions.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing is tracked.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
