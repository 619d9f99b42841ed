//! Path validation for every filesystem-touching operation.
//!
//! Resolution runs in two stages:
//! 1. [`policy`]: lexical normalization, denylist and boundary decisions
//!    (pure, no I/O)
//! 2. [`resolve`]: symlink resolution of the longest existing prefix
//!
//! The denylist is checked on both the lexical and the resolved form, so a
//! symlink cannot smuggle a request into a denied location.

pub mod policy;
mod resolve;

#[cfg(test)]
mod tests;

pub use policy::Denylist;

use crate::error::{Error, RejectReason, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Validates and canonicalizes untrusted paths.
#[derive(Debug, Clone)]
pub struct PathGuard {
    denylist: Arc<Denylist>,
    base_dir: PathBuf,
    home_dir: Option<PathBuf>,
}

impl Default for PathGuard {
    fn default() -> Self {
        Self::new(Denylist::standard())
    }
}

impl PathGuard {
    /// Create a guard. Relative paths resolve against the home directory,
    /// or the temp directory when there is no home or it is denylisted
    /// (e.g. `/root`).
    pub fn new(denylist: Denylist) -> Self {
        let home_dir = dirs::home_dir();
        let base_dir = fallback_base(&denylist, home_dir.as_deref());
        Self {
            denylist: Arc::new(denylist),
            base_dir,
            home_dir,
        }
    }

    /// Use `base` for relative paths. Ignored unless absolute.
    #[must_use]
    pub fn with_base_dir(mut self, base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        if base.is_absolute() {
            self.base_dir = base;
        } else {
            warn!(base = %base.display(), "Ignoring relative base directory");
        }
        self
    }

    /// Directory relative paths are anchored to.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Active denylist.
    pub fn denylist(&self) -> &Denylist {
        &self.denylist
    }

    /// Resolve `raw` to an absolute, symlink-free path outside every
    /// denylisted location.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf> {
        let lexical = policy::normalize_lexically(raw, &self.base_dir, self.home_dir.as_deref())
            .map_err(|e| log_rejection(raw, e))?;
        self.denylist
            .check(&lexical)
            .map_err(|e| log_rejection(raw, e))?;

        let resolved = resolve::resolve_existing_prefix(&lexical)
            .map_err(|e| log_rejection(raw, unresolvable(&lexical, e)))?;
        self.denylist
            .check(&resolved)
            .map_err(|e| log_rejection(raw, e))?;

        debug!(original = %raw, resolved = %resolved.display(), "Path resolved");
        Ok(resolved)
    }

    /// Resolve `raw` and additionally require the result to stay at or
    /// below `boundary`. Relative input is anchored to `boundary`, and `~`
    /// is not expanded. `boundary` must exist.
    pub fn resolve_within(&self, raw: &str, boundary: &Path) -> Result<PathBuf> {
        let boundary = std::fs::canonicalize(boundary).map_err(|e| Error::from_io(e, boundary))?;

        let lexical = policy::normalize_lexically(raw, &boundary, None)
            .map_err(|e| log_rejection(raw, e))?;
        policy::check_boundary(raw, &lexical, &boundary).map_err(|e| log_rejection(raw, e))?;
        self.denylist
            .check(&lexical)
            .map_err(|e| log_rejection(raw, e))?;

        let resolved = resolve::resolve_existing_prefix(&lexical)
            .map_err(|e| log_rejection(raw, unresolvable(&lexical, e)))?;
        if !resolved.starts_with(&boundary) {
            return Err(log_rejection(
                raw,
                Error::rejected(
                    RejectReason::Traversal,
                    format!("'{}' resolves outside '{}'", raw, boundary.display()),
                ),
            ));
        }
        self.denylist
            .check(&resolved)
            .map_err(|e| log_rejection(raw, e))?;

        debug!(
            original = %raw,
            boundary = %boundary.display(),
            resolved = %resolved.display(),
            "Scoped path resolved"
        );
        Ok(resolved)
    }

    /// [`resolve`](Self::resolve) for a path taken from configuration or
    /// defaults rather than from a request.
    pub fn resolve_path(&self, path: &Path) -> Result<PathBuf> {
        self.resolve(&path.to_string_lossy())
    }

    /// Apply the denylist to an already-absolute path without resolving it.
    pub fn check_absolute(&self, path: &Path) -> Result<()> {
        self.denylist.check(path).map_err(|e| {
            warn!(path = %path.display(), reason = %e, "Path rejected");
            e
        })
    }
}

fn fallback_base(denylist: &Denylist, home: Option<&Path>) -> PathBuf {
    match home {
        Some(home) if denylist.matching_entry(home).is_none() => home.to_path_buf(),
        Some(home) => {
            debug!(home = %home.display(), "Home directory is denylisted, using temp dir as base");
            std::env::temp_dir()
        }
        None => std::env::temp_dir(),
    }
}

fn unresolvable(path: &Path, err: std::io::Error) -> Error {
    match err.kind() {
        std::io::ErrorKind::PermissionDenied => Error::from_io(err, path),
        _ => Error::rejected(
            RejectReason::Unparseable,
            format!("cannot resolve '{}': {}", path.display(), err),
        ),
    }
}

fn log_rejection(raw: &str, err: Error) -> Error {
    if let Error::Rejected { reason, detail } = &err {
        warn!(path = %raw, reason = %reason, detail = %detail, "Path rejected");
    }
    err
}
