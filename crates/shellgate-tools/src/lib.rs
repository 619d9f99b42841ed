//! Shellgate Tools - sandboxed execution runtime
//!
//! This crate holds everything that touches the host:
//! - PathGuard: path normalization, denylist and boundary checks
//! - Exec: bounded shell command execution with process-group kill
//! - Scripts: named scripts with JSON metadata
//! - Files: guarded listing, reading, writing and deletion
//! - Pty: interactive shells on pseudo-terminals
//! - Gate: the runtime on/off switch and the capability it mints

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod exec;
pub mod files;
pub mod gate;
pub mod path_guard;
pub mod pty;
pub mod scripts;

mod fs_util;
#[cfg(test)]
mod test_log;

pub use error::{Error, RejectReason, Result};
pub use exec::{
    BackgroundExecutions, CommandExecutor, CommandLine, CommandRequest, CommandResult,
    CommandStatus, ExecConfig, ExecutionSnapshot, ExecutionState, TimeoutBounds,
};
pub use files::{DeleteFailure, DeleteOutcome, DirectoryEntry, EntryKind, FileBrowser};
pub use gate::{ExecCapability, FeatureGate};
pub use path_guard::{Denylist, PathGuard};
pub use pty::{PtyOutput, PtySessions, PtySignal};
pub use scripts::{ScriptInfo, ScriptStore};
