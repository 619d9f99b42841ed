//! Graceful shutdown
//!
//! The server holds one [`ShutdownController`]. Long-running work registers
//! a [`TaskGuard`]; `shutdown` cancels the shared token and waits for those
//! guards to drop, up to a timeout.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Lifecycle of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    /// Serving requests
    Running,
    /// Cancelled, waiting for registered tasks
    Draining,
    /// Done
    Terminated,
}

impl ShutdownPhase {
    fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Terminated => "terminated",
        }
    }
}

impl std::fmt::Display for ShutdownPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which signal asked the process to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGINT / Ctrl+C
    Interrupt,
    /// SIGTERM
    Terminate,
}

/// Coordinates shutdown across the server and its background tasks.
#[derive(Debug)]
pub struct ShutdownController {
    token: CancellationToken,
    phase: watch::Sender<ShutdownPhase>,
    active: AtomicUsize,
    drained: Notify,
    drain_timeout: Duration,
}

impl ShutdownController {
    /// Controller with the default drain timeout.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Self::with_timeout(DEFAULT_DRAIN_TIMEOUT)
    }

    /// Controller that waits at most `drain_timeout` for registered tasks.
    #[must_use]
    pub fn with_timeout(drain_timeout: Duration) -> Arc<Self> {
        let (phase, _) = watch::channel(ShutdownPhase::Running);
        Arc::new(Self {
            token: CancellationToken::new(),
            phase,
            active: AtomicUsize::new(0),
            drained: Notify::new(),
            drain_timeout,
        })
    }

    /// A token that is cancelled when shutdown starts.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> ShutdownPhase {
        *self.phase.borrow()
    }

    /// Observe phase changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ShutdownPhase> {
        self.phase.subscribe()
    }

    /// Whether shutdown has started.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.phase() != ShutdownPhase::Running
    }

    /// Count a task that `shutdown` should wait for until the guard drops.
    pub fn register_task(self: &Arc<Self>) -> TaskGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        TaskGuard {
            controller: Arc::clone(self),
        }
    }

    /// Registered tasks that have not finished.
    #[must_use]
    pub fn active_task_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Cancel the token and wait for registered tasks, at most the drain
    /// timeout. Later calls return immediately.
    pub async fn shutdown(&self) {
        let started = self.phase.send_if_modified(|phase| {
            if *phase == ShutdownPhase::Running {
                *phase = ShutdownPhase::Draining;
                true
            } else {
                false
            }
        });
        if !started {
            debug!("Shutdown already in progress");
            return;
        }

        info!(active_tasks = self.active_task_count(), "Shutdown started");
        self.token.cancel();

        if tokio::time::timeout(self.drain_timeout, self.wait_drained())
            .await
            .is_err()
        {
            warn!(
                active_tasks = self.active_task_count(),
                timeout_secs = self.drain_timeout.as_secs(),
                "Tasks still running after drain timeout"
            );
        }

        self.phase.send_replace(ShutdownPhase::Terminated);
        info!("Shutdown complete");
    }

    async fn wait_drained(&self) {
        loop {
            let notified = self.drained.notified();
            if self.active_task_count() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn release(&self) {
        if self.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }
}

/// Keeps a task counted by its [`ShutdownController`] while alive.
#[derive(Debug)]
pub struct TaskGuard {
    controller: Arc<ShutdownController>,
}

impl TaskGuard {
    /// Whether shutdown was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.controller.token.is_cancelled()
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.controller.release();
    }
}

/// Resolve on SIGINT or SIGTERM. A handler that cannot be installed is
/// logged and never fires.
pub async fn wait_for_shutdown_signal() -> ShutdownSignal {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Cannot listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let received = tokio::select! {
        _ = interrupt => ShutdownSignal::Interrupt,
        _ = terminate => ShutdownSignal::Terminate,
    };
    info!(signal = ?received, "Shutdown signal received");
    received
}
