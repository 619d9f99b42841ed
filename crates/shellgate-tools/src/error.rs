//! Error types for shellgate-tools

use serde::Serialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Why a request was refused before any side effect happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// A `..` component or symlink escapes the permitted root
    Traversal,
    /// An absolute path lies outside the permitted root
    OutsideBoundary,
    /// The path is, or lies under, a denylisted location
    Denylisted,
    /// The input cannot be interpreted as a path
    Unparseable,
    /// Script name fails the naming rules
    InvalidName,
    /// Schedule is not a 5-field cron expression
    InvalidSchedule,
    /// File operation aimed at a directory or vice versa
    WrongKind,
    /// Command request is malformed
    InvalidCommand,
}

impl RejectReason {
    /// Stable machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            Self::Traversal => "E_TRAVERSAL",
            Self::OutsideBoundary => "E_OUTSIDE_BOUNDARY",
            Self::Denylisted => "E_DENYLISTED",
            Self::Unparseable => "E_UNPARSEABLE",
            Self::InvalidName => "E_INVALID_NAME",
            Self::InvalidSchedule => "E_INVALID_SCHEDULE",
            Self::WrongKind => "E_WRONG_KIND",
            Self::InvalidCommand => "E_INVALID_COMMAND",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Runtime error type
#[derive(Debug, Error)]
pub enum Error {
    /// Refused by validation or path policy
    #[error("rejected ({reason}): {detail}")]
    Rejected {
        /// Reason code
        reason: RejectReason,
        /// Human-readable detail, safe to show the caller
        detail: String,
    },

    /// Target does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// File exceeds the read limit
    #[error("file too large: {size} bytes (max {limit})")]
    TooLarge {
        /// Actual size in bytes
        size: u64,
        /// Configured limit in bytes
        limit: u64,
    },

    /// The OS refused access
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Feature gate is closed or caller is not authorized
    #[error("terminal feature unavailable: {0}")]
    Unavailable(String),

    /// Process could not be started or controlled
    #[error("execution failed: {0}")]
    Execution(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata (de)serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Build a rejection.
    pub fn rejected(reason: RejectReason, detail: impl Into<String>) -> Self {
        Self::Rejected {
            reason,
            detail: detail.into(),
        }
    }

    /// Build a rejection and log it at `warn`. Path and script checks log
    /// through their own helpers with the raw input attached.
    pub fn rejected_logged(reason: RejectReason, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        warn!(reason = %reason, detail = %detail, "Request rejected");
        Self::Rejected { reason, detail }
    }

    /// Map an I/O error on `path` to the closest caller-facing variant.
    pub fn from_io(err: std::io::Error, path: &Path) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.display().to_string()),
            std::io::ErrorKind::PermissionDenied => {
                Self::PermissionDenied(path.display().to_string())
            }
            _ => Self::Io(err),
        }
    }

    /// Stable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Rejected { reason, .. } => reason.code(),
            Self::NotFound(_) => "E_NOT_FOUND",
            Self::TooLarge { .. } => "E_TOO_LARGE",
            Self::PermissionDenied(_) => "E_PERMISSION_DENIED",
            Self::Unavailable(_) => "E_FEATURE_DISABLED",
            Self::Execution(_) | Self::Io(_) | Self::Serialization(_) => "E_INTERNAL",
        }
    }

    /// Whether details must stay server-side.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Execution(_) | Self::Io(_) | Self::Serialization(_)
        )
    }

    /// Message safe to return to the caller.
    pub fn public_message(&self) -> String {
        if self.is_internal() {
            "internal error".to_string()
        } else {
            self.to_string()
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
