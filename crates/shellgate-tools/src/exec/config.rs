//! Executor configuration types

use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Default timeout for a foreground command.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Smallest accepted timeout.
pub const MIN_TIMEOUT_SECS: u64 = 1;
/// Largest accepted foreground timeout.
pub const MAX_TIMEOUT_SECS: u64 = 300;
/// Default and largest timeout for background executions.
pub const BACKGROUND_MAX_TIMEOUT_SECS: u64 = 3600;
/// Per-stream capture limit.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;
/// Shell used for command strings.
pub const DEFAULT_SHELL: &str = "/bin/sh";
/// Exit code reported for timed-out commands, matching coreutils `timeout`.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Inclusive timeout range plus the value used when none is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutBounds {
    /// Used when the request has no timeout
    pub default_secs: u64,
    /// Lower bound
    pub min_secs: u64,
    /// Upper bound
    pub max_secs: u64,
}

impl TimeoutBounds {
    /// Foreground bounds: default 30, range 1..=300.
    pub const FOREGROUND: Self = Self {
        default_secs: DEFAULT_TIMEOUT_SECS,
        min_secs: MIN_TIMEOUT_SECS,
        max_secs: MAX_TIMEOUT_SECS,
    };

    /// Background bounds: default and max 3600.
    pub const BACKGROUND: Self = Self {
        default_secs: BACKGROUND_MAX_TIMEOUT_SECS,
        min_secs: MIN_TIMEOUT_SECS,
        max_secs: BACKGROUND_MAX_TIMEOUT_SECS,
    };

    /// Clamp a requested timeout into range, logging any adjustment.
    pub fn effective(&self, requested: Option<u64>) -> Duration {
        let secs = match requested {
            None => self.default_secs,
            Some(secs) if secs < self.min_secs => {
                warn!(requested = secs, applied = self.min_secs, "Timeout below minimum, clamped");
                self.min_secs
            }
            Some(secs) if secs > self.max_secs => {
                warn!(requested = secs, applied = self.max_secs, "Timeout above maximum, clamped");
                self.max_secs
            }
            Some(secs) => secs,
        };
        Duration::from_secs(secs)
    }
}

/// Configuration for command execution
#[derive(Debug, Clone)]
pub struct ExecConfig {
    /// Shell used for command strings (`<shell> -c <command>`)
    pub shell: PathBuf,
    /// Foreground timeout policy
    pub foreground: TimeoutBounds,
    /// Background timeout policy
    pub background: TimeoutBounds,
    /// Maximum captured bytes per stream
    pub max_output_bytes: usize,
    /// Working directory when the request names none
    pub default_cwd: Option<PathBuf>,
    /// How long to wait for output readers after killing a process group
    pub kill_grace: Duration,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            shell: PathBuf::from(DEFAULT_SHELL),
            foreground: TimeoutBounds::FOREGROUND,
            background: TimeoutBounds::BACKGROUND,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            default_cwd: None,
            kill_grace: Duration::from_secs(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_clamping() {
        let b = TimeoutBounds::FOREGROUND;
        assert_eq!(b.effective(None), Duration::from_secs(30));
        assert_eq!(b.effective(Some(0)), Duration::from_secs(1));
        assert_eq!(b.effective(Some(45)), Duration::from_secs(45));
        assert_eq!(b.effective(Some(301)), Duration::from_secs(300));
        assert_eq!(b.effective(Some(u64::MAX)), Duration::from_secs(300));
    }

    #[test]
    fn test_background_bounds() {
        let b = TimeoutBounds::BACKGROUND;
        assert_eq!(b.effective(None), Duration::from_secs(3600));
        assert_eq!(b.effective(Some(7200)), Duration::from_secs(3600));
    }
}
