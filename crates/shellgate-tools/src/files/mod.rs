//! Guarded filesystem browsing
//!
//! Every operation resolves its input through [`PathGuard`] first and only
//! then touches the filesystem.

mod delete;
mod list;
mod read;
mod write;

#[cfg(test)]
mod tests;

use crate::path_guard::PathGuard;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use utoipa::ToSchema;

/// Largest file `read_file` will return.
pub const DEFAULT_MAX_READ_BYTES: u64 = 1024 * 1024;

/// Entry type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Regular file or anything that is not a directory
    File,
    /// Directory
    Directory,
}

/// One row of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DirectoryEntry {
    /// File name
    pub name: String,
    /// Absolute path
    #[schema(value_type = String)]
    pub path: PathBuf,
    /// Entry type
    pub kind: EntryKind,
    /// Size in bytes, 0 for directories
    pub size: u64,
    /// Last modification time, when the platform reports one
    pub modified: Option<DateTime<Utc>>,
}

/// A path that could not be removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DeleteFailure {
    /// Path that survived
    pub path: String,
    /// OS error text
    pub error: String,
}

/// Result of a recursive delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeleteOutcome {
    /// Whole subtree removed
    Deleted {
        /// Files removed
        files: u64,
        /// Directories removed, including the root
        directories: u64,
    },
    /// Some entries could not be removed
    Partial {
        /// Entries removed
        deleted: u64,
        /// Entries left behind
        failed: Vec<DeleteFailure>,
    },
}

/// File operations behind a path guard.
#[derive(Debug, Clone)]
pub struct FileBrowser {
    guard: PathGuard,
    max_read_bytes: u64,
}

impl FileBrowser {
    /// Create a browser with the default read limit.
    pub fn new(guard: PathGuard) -> Self {
        Self {
            guard,
            max_read_bytes: DEFAULT_MAX_READ_BYTES,
        }
    }

    /// Override the read limit.
    #[must_use]
    pub fn with_max_read_bytes(mut self, limit: u64) -> Self {
        self.max_read_bytes = limit;
        self
    }

    /// Guard used for every path.
    pub fn guard(&self) -> &PathGuard {
        &self.guard
    }
}
