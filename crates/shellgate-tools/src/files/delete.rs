use super::{DeleteFailure, DeleteOutcome, FileBrowser};
use crate::error::{Error, RejectReason, Result};
use crate::path_guard::PathGuard;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

impl FileBrowser {
    /// Delete a single file.
    pub async fn delete_file(&self, raw: &str) -> Result<()> {
        let path = self.guard.resolve(raw)?;
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| Error::from_io(e, &path))?;
        if meta.is_dir() {
            return Err(Error::rejected_logged(
                RejectReason::WrongKind,
                format!("'{}' is a directory, use directory delete", path.display()),
            ));
        }
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| Error::from_io(e, &path))?;
        info!(path = %path.display(), "File deleted");
        Ok(())
    }

    /// Delete a directory and everything below it.
    ///
    /// The whole subtree is checked against the denylist before anything is
    /// removed. Symlinks are removed, never followed, and other filesystems
    /// mounted inside the tree are not entered.
    pub async fn delete_directory_recursive(&self, raw: &str) -> Result<DeleteOutcome> {
        let root = self.guard.resolve(raw)?;
        let meta = tokio::fs::metadata(&root)
            .await
            .map_err(|e| Error::from_io(e, &root))?;
        if !meta.is_dir() {
            return Err(Error::rejected_logged(
                RejectReason::WrongKind,
                format!("'{}' is not a directory", root.display()),
            ));
        }

        let guard = self.guard.clone();
        let outcome = tokio::task::spawn_blocking(move || remove_tree(&guard, &root))
            .await
            .map_err(|e| Error::Execution(format!("delete task failed: {}", e)))??;
        Ok(outcome)
    }
}

struct Planned {
    path: PathBuf,
    is_dir: bool,
}

fn remove_tree(guard: &PathGuard, root: &Path) -> Result<DeleteOutcome> {
    let mut plan = Vec::new();
    let mut failed = Vec::new();

    for item in WalkDir::new(root)
        .follow_links(false)
        .same_file_system(true)
        .contents_first(true)
    {
        match item {
            Ok(entry) => {
                guard.check_absolute(entry.path())?;
                plan.push(Planned {
                    path: entry.path().to_path_buf(),
                    is_dir: entry.file_type().is_dir(),
                });
            }
            Err(e) => {
                let path = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| root.display().to_string());
                failed.push(DeleteFailure {
                    path,
                    error: e.to_string(),
                });
            }
        }
    }

    let mut files = 0u64;
    let mut directories = 0u64;
    for item in plan {
        let removed = if item.is_dir {
            std::fs::remove_dir(&item.path)
        } else {
            std::fs::remove_file(&item.path)
        };
        match removed {
            Ok(()) if item.is_dir => directories += 1,
            Ok(()) => files += 1,
            Err(e) => failed.push(DeleteFailure {
                path: item.path.display().to_string(),
                error: e.to_string(),
            }),
        }
    }

    if failed.is_empty() {
        info!(path = %root.display(), files, directories, "Directory deleted");
        Ok(DeleteOutcome::Deleted { files, directories })
    } else {
        for failure in &failed {
            warn!(path = %failure.path, error = %failure.error, "Could not delete entry");
        }
        warn!(
            path = %root.display(),
            deleted = files + directories,
            failed = failed.len(),
            "Directory only partially deleted"
        );
        Ok(DeleteOutcome::Partial {
            deleted: files + directories,
            failed,
        })
    }
}
