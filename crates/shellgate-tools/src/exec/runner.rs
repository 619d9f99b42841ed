use super::process_group::kill_group;
use super::{CommandLine, CommandStatus};
use crate::error::{Error, RejectReason, Result};
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Output collected up to a byte limit; bytes past the limit are counted
/// and discarded so the child never blocks on a full pipe.
#[derive(Debug, Default)]
pub(crate) struct CappedBuffer {
    data: Vec<u8>,
    seen: u64,
    limit: usize,
}

impl CappedBuffer {
    fn new(limit: usize) -> Self {
        Self {
            data: Vec::new(),
            seen: 0,
            limit,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        let room = self.limit.saturating_sub(self.data.len());
        let keep = room.min(chunk.len());
        self.data.extend_from_slice(&chunk[..keep]);
        self.seen += chunk.len() as u64;
    }

    /// Bytes dropped by the limit.
    pub(crate) fn omitted(&self) -> u64 {
        self.seen - self.data.len() as u64
    }

    pub(crate) fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Raw outcome of one process run.
#[derive(Debug)]
pub(crate) struct RawRun {
    pub stdout: CappedBuffer,
    pub stderr: CappedBuffer,
    pub status: CommandStatus,
    pub elapsed: Duration,
}

async fn pump<R>(mut reader: R, sink: Arc<Mutex<CappedBuffer>>)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => sink.lock().await.push(&chunk[..n]),
        }
    }
}

fn build_command(shell: &Path, line: &CommandLine) -> Command {
    match line {
        CommandLine::Shell(script) => {
            let mut c = Command::new(shell);
            c.arg("-c").arg(script);
            c
        }
        CommandLine::Argv { program, args } => {
            let mut c = Command::new(program);
            c.args(args);
            c
        }
    }
}

fn exit_status(status: std::process::ExitStatus) -> CommandStatus {
    if let Some(code) = status.code() {
        return CommandStatus::Exited { code };
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return CommandStatus::Signaled { signal };
        }
    }
    CommandStatus::Exited { code: -1 }
}

/// Run one process in its own process group. Past `timeout` the whole
/// group is killed and whatever was captured so far is returned.
pub(crate) async fn run_process(
    shell: &Path,
    line: &CommandLine,
    cwd: &Path,
    timeout: Duration,
    max_output_bytes: usize,
    kill_grace: Duration,
) -> Result<RawRun> {
    let mut cmd = build_command(shell, line);
    cmd.current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let started = Instant::now();
    let deadline = tokio::time::Instant::now() + timeout;

    let mut child = cmd.spawn().map_err(|e| match (e.kind(), line) {
        (std::io::ErrorKind::NotFound, CommandLine::Argv { program, .. }) => Error::rejected_logged(
            RejectReason::InvalidCommand,
            format!("program '{}' not found", program),
        ),
        _ => Error::Execution(format!("failed to spawn process: {}", e)),
    })?;
    let pid = child.id();

    let stdout = Arc::new(Mutex::new(CappedBuffer::new(max_output_bytes)));
    let stderr = Arc::new(Mutex::new(CappedBuffer::new(max_output_bytes)));
    let mut readers: Vec<JoinHandle<()>> = Vec::with_capacity(2);
    if let Some(out) = child.stdout.take() {
        readers.push(tokio::spawn(pump(out, stdout.clone())));
    }
    if let Some(err) = child.stderr.take() {
        readers.push(tokio::spawn(pump(err, stderr.clone())));
    }
    let abort_handles: Vec<_> = readers.iter().map(JoinHandle::abort_handle).collect();
    let mut drain = Box::pin(async move {
        for reader in readers {
            let _ = reader.await;
        }
    });

    let exited = match tokio::time::timeout_at(deadline, child.wait()).await {
        Ok(Ok(status)) => Some(status),
        Ok(Err(e)) => {
            if let Some(pid) = pid {
                let _ = kill_group(pid);
            }
            return Err(Error::Execution(format!("failed to wait for process: {}", e)));
        }
        Err(_) => None,
    };

    // The shell may exit while descendants still hold the pipes open.
    let mut drained = match exited {
        Some(_) => tokio::time::timeout_at(deadline, &mut drain).await.is_ok(),
        None => false,
    };

    let status = match exited {
        Some(status) if drained => exit_status(status),
        _ => {
            if let Some(pid) = pid {
                if let Err(e) = kill_group(pid) {
                    warn!(pid, error = %e, "Failed to kill process group");
                }
            }
            let _ = child.kill().await;
            drained = tokio::time::timeout(kill_grace, &mut drain).await.is_ok();
            CommandStatus::TimedOut
        }
    };

    if !drained {
        debug!("Output readers still open after kill, aborting");
        for handle in &abort_handles {
            handle.abort();
        }
    }

    let stdout = std::mem::take(&mut *stdout.lock().await);
    let stderr = std::mem::take(&mut *stderr.lock().await);

    Ok(RawRun {
        stdout,
        stderr,
        status,
        elapsed: started.elapsed(),
    })
}
