//! A single PTY-backed shell

use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;

const READ_CHUNK: usize = 4096;
/// Most bytes returned by one drain.
const MAX_DRAIN_BYTES: usize = 256 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionStatus {
    Running,
    Exited(i32),
}

pub(crate) struct PtySession {
    pub child: tokio::process::Child,
    pub pty: pty_process::Pty,
    pub pid: Option<u32>,
    pub cwd: String,
    pub created_at: Instant,
    pub last_activity: Instant,
    pub status: SessionStatus,
}

impl PtySession {
    pub(crate) fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Pull whatever the terminal has buffered, waiting at most `wait` for
    /// each chunk. Stops early once `MAX_DRAIN_BYTES` have been collected.
    pub(crate) async fn drain(&mut self, wait: Duration) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = [0u8; READ_CHUNK];
        while out.len() < MAX_DRAIN_BYTES {
            match tokio::time::timeout(wait, self.pty.read(&mut buf)).await {
                Ok(Ok(0)) | Ok(Err(_)) | Err(_) => break,
                Ok(Ok(n)) => out.extend_from_slice(&buf[..n]),
            }
        }
        out
    }

    /// Update `status` from the child without blocking.
    pub(crate) fn poll_exit(&mut self) -> SessionStatus {
        if self.status == SessionStatus::Running {
            match self.child.try_wait() {
                Ok(Some(status)) => self.status = SessionStatus::Exited(status.code().unwrap_or(-1)),
                Ok(None) => {}
                Err(_) => self.status = SessionStatus::Exited(-1),
            }
        }
        self.status
    }

    pub(crate) fn is_stale(&self, ttl: Duration, now: Instant) -> bool {
        now.duration_since(self.last_activity) > ttl
    }
}
