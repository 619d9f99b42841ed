//! Interactive shells on pseudo-terminals
//!
//! Each session is a login-less `/bin/bash` spawned on its own PTY and in its
//! own session, so the shell's pid is also its process-group id. Output is
//! returned raw: it is meant for a terminal emulator, not for HTML.

mod session;


use crate::error::{Error, RejectReason, Result};
use crate::exec::process_group::{kill_group, signal_group};
use crate::gate::ExecCapability;
use crate::path_guard::PathGuard;
use nix::sys::signal::Signal;
use serde::{Deserialize, Serialize};
use session::{PtySession, SessionStatus};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Shell started for new sessions.
pub const DEFAULT_PTY_SHELL: &str = "/bin/bash";
/// Idle time after which a session is reaped.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 1800;

const READ_WAIT: Duration = Duration::from_millis(100);
const SESSION_ID_LEN: usize = 12;
const PASSED_ENV: &[&str] = &["PATH", "HOME", "USER", "LANG", "LC_ALL"];

/// Signal a client may send to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PtySignal {
    /// SIGINT, like Ctrl+C
    Interrupt,
    /// SIGTERM
    Terminate,
    /// SIGKILL
    Kill,
}

impl PtySignal {
    fn as_signal(self) -> Signal {
        match self {
            Self::Interrupt => Signal::SIGINT,
            Self::Terminate => Signal::SIGTERM,
            Self::Kill => Signal::SIGKILL,
        }
    }
}

/// Output drained from a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PtyOutput {
    /// Bytes produced since the previous read, lossily decoded
    pub output: String,
    /// Whether the shell is still alive
    pub running: bool,
    /// Exit code once the shell has exited
    pub exit_code: Option<i32>,
}

type SessionHandle = Arc<Mutex<PtySession>>;

/// Live PTY sessions keyed by id. The map lock only guards membership;
/// terminal I/O happens under the session's own lock.
#[derive(Clone)]
pub struct PtySessions {
    sessions: Arc<Mutex<HashMap<String, SessionHandle>>>,
    guard: PathGuard,
    shell: PathBuf,
    ttl: Duration,
}

impl std::fmt::Debug for PtySessions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtySessions")
            .field("shell", &self.shell)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl PtySessions {
    /// Create an empty registry.
    pub fn new(guard: PathGuard) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            guard,
            shell: PathBuf::from(DEFAULT_PTY_SHELL),
            ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
        }
    }

    /// Use a different shell binary.
    #[must_use]
    pub fn with_shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Idle time before a session is reaped.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Start a shell. `cwd`, or the guard's base directory without one,
    /// goes through the path guard and must be an existing directory.
    pub async fn start(&self, _cap: &ExecCapability, cwd: Option<&str>) -> Result<String> {
        let dir = match cwd {
            Some(raw) => self.guard.resolve(raw)?,
            None => self.guard.resolve_path(self.guard.base_dir())?,
        };
        let meta = tokio::fs::metadata(&dir)
            .await
            .map_err(|e| Error::from_io(e, &dir))?;
        if !meta.is_dir() {
            return Err(Error::rejected_logged(
                RejectReason::WrongKind,
                format!("'{}' is not a directory", dir.display()),
            ));
        }

        let (pty, pts) =
            pty_process::open().map_err(|e| Error::Execution(format!("failed to open PTY: {}", e)))?;

        let mut cmd = pty_process::Command::new(&self.shell).env_clear();
        for key in PASSED_ENV {
            if let Ok(value) = std::env::var(key) {
                cmd = cmd.env(key, value);
            }
        }
        cmd = cmd.env("TERM", "xterm-256color").current_dir(&dir);

        let child = cmd.spawn(pts).map_err(|e| {
            Error::Execution(format!("failed to spawn {}: {}", self.shell.display(), e))
        })?;

        let id = Uuid::new_v4().as_simple().to_string()[..SESSION_ID_LEN].to_string();
        let now = Instant::now();
        let pid = child.id();
        let session = PtySession {
            child,
            pty,
            pid,
            cwd: dir.display().to_string(),
            created_at: now,
            last_activity: now,
            status: SessionStatus::Running,
        };
        self.sessions
            .lock()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(session)));
        info!(session_id = %id, pid = ?pid, cwd = %dir.display(), "PTY session started");
        Ok(id)
    }

    /// Drain pending output and report whether the shell is alive.
    pub async fn read(&self, id: &str) -> Result<PtyOutput> {
        let handle = self.lookup(id).await?;
        let mut session = handle.lock().await;
        session.touch();

        let bytes = session.drain(READ_WAIT).await;
        let status = session.poll_exit();
        Ok(PtyOutput {
            output: String::from_utf8_lossy(&bytes).into_owned(),
            running: status == SessionStatus::Running,
            exit_code: match status {
                SessionStatus::Exited(code) => Some(code),
                SessionStatus::Running => None,
            },
        })
    }

    /// Send input to the shell.
    pub async fn write(&self, id: &str, data: &[u8]) -> Result<()> {
        let handle = self.lookup(id).await?;
        let mut session = handle.lock().await;
        if let SessionStatus::Exited(code) = session.poll_exit() {
            return Err(Error::rejected_logged(
                RejectReason::InvalidCommand,
                format!("session '{}' has exited with code {}", id, code),
            ));
        }
        session.touch();
        session
            .pty
            .write_all(data)
            .await
            .map_err(|e| Error::Execution(format!("failed to write to session: {}", e)))?;
        debug!(session_id = %id, bytes = data.len(), "PTY input written");
        Ok(())
    }

    /// Signal the session's whole process group.
    pub async fn signal(&self, id: &str, signal: PtySignal) -> Result<()> {
        let handle = self.lookup(id).await?;
        let mut session = handle.lock().await;
        session.touch();
        if session.poll_exit() != SessionStatus::Running {
            return Ok(());
        }
        if let Some(pid) = session.pid {
            signal_group(pid, signal.as_signal())
                .map_err(|e| Error::Execution(format!("failed to signal session: {}", e)))?;
            info!(session_id = %id, signal = ?signal, "PTY session signalled");
        }
        Ok(())
    }

    /// Terminate and forget a session.
    pub async fn close(&self, id: &str) -> Result<()> {
        let session = self
            .sessions
            .lock()
            .await
            .remove(id)
            .ok_or_else(|| Error::NotFound(format!("session '{}'", id)))?;
        terminate(id, session).await;
        Ok(())
    }

    /// Terminate every session. Used on shutdown.
    pub async fn close_all(&self) -> usize {
        let drained: Vec<(String, SessionHandle)> = self.sessions.lock().await.drain().collect();
        let count = drained.len();
        for (id, session) in drained {
            terminate(&id, session).await;
        }
        if count > 0 {
            info!(count, "Closed all PTY sessions");
        }
        count
    }

    /// Drop sessions idle for longer than the TTL, killing any that are
    /// still running. Sessions busy with a request are not idle. Returns how
    /// many were removed.
    pub async fn reap_idle(&self) -> usize {
        let now = Instant::now();
        let snapshot: Vec<(String, SessionHandle)> = self
            .sessions
            .lock()
            .await
            .iter()
            .map(|(id, handle)| (id.clone(), Arc::clone(handle)))
            .collect();

        let mut reaped = 0;
        for (id, handle) in snapshot {
            let age_secs = match handle.try_lock() {
                Ok(session) if session.is_stale(self.ttl, now) => {
                    session.created_at.elapsed().as_secs()
                }
                _ => continue,
            };
            let removed = {
                let mut sessions = self.sessions.lock().await;
                match sessions.get(&id) {
                    Some(current) if Arc::ptr_eq(current, &handle) => sessions.remove(&id),
                    _ => None,
                }
            };
            if let Some(handle) = removed {
                debug!(session_id = %id, age_secs, "Reaping idle PTY session");
                terminate(&id, handle).await;
                reaped += 1;
            }
        }
        reaped
    }

    /// Run [`reap_idle`](Self::reap_idle) every `interval` until the handle
    /// is aborted.
    pub fn spawn_reaper(&self, interval: Duration) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let reaped = this.reap_idle().await;
                if reaped > 0 {
                    info!(reaped, "Reaped idle PTY sessions");
                }
            }
        })
    }

    /// Clone the handle for `id`, releasing the map lock before any I/O.
    async fn lookup(&self, id: &str) -> Result<SessionHandle> {
        self.sessions
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("session '{}'", id)))
    }

    /// Whether `id` names a live entry.
    pub async fn contains(&self, id: &str) -> bool {
        self.sessions.lock().await.contains_key(id)
    }

    /// Number of sessions.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Whether there are no sessions.
    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

async fn terminate(id: &str, handle: SessionHandle) {
    let mut session = handle.lock().await;
    if let Some(pid) = session.pid {
        if let Err(e) = kill_group(pid) {
            warn!(session_id = %id, error = %e, "Failed to kill PTY process group");
        }
    }
    let _ = session.child.kill().await;
    info!(session_id = %id, cwd = %session.cwd, "PTY session closed");
}
