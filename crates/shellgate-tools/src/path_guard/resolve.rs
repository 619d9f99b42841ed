//! Symlink resolution for paths that may not exist yet.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

/// Canonicalize the longest existing ancestor of `path` and append the
/// remaining components unchanged. `path` must already be lexically
/// normalized (absolute, no `..`).
///
/// A component that exists only as a dangling symlink is an error: writing
/// through it would land wherever the link points.
pub(crate) fn resolve_existing_prefix(path: &Path) -> io::Result<PathBuf> {
    let mut existing = path.to_path_buf();
    let mut missing: Vec<OsString> = Vec::new();

    loop {
        match std::fs::canonicalize(&existing) {
            Ok(mut resolved) => {
                for part in missing.iter().rev() {
                    resolved.push(part);
                }
                return Ok(resolved);
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                if std::fs::symlink_metadata(&existing).is_ok() {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("'{}' is a dangling symlink", existing.display()),
                    ));
                }
                match (existing.parent(), existing.file_name()) {
                    (Some(parent), Some(name)) => {
                        missing.push(name.to_os_string());
                        existing = parent.to_path_buf();
                    }
                    _ => return Err(err),
                }
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existing_path_is_canonicalized() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::fs::create_dir(root.join("a")).unwrap();
        let resolved = resolve_existing_prefix(&root.join("a")).unwrap();
        assert_eq!(resolved, root.join("a"));
    }

    #[test]
    fn test_missing_tail_is_appended() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let resolved = resolve_existing_prefix(&root.join("new/deeper/file.txt")).unwrap();
        assert_eq!(resolved, root.join("new/deeper/file.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_ancestor_is_followed() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::fs::create_dir(root.join("real")).unwrap();
        std::os::unix::fs::symlink(root.join("real"), root.join("link")).unwrap();
        let resolved = resolve_existing_prefix(&root.join("link/child.txt")).unwrap();
        assert_eq!(resolved, root.join("real/child.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::os::unix::fs::symlink(root.join("nowhere"), root.join("dangling")).unwrap();
        let err = resolve_existing_prefix(&root.join("dangling")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
