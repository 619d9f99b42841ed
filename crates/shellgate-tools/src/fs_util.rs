//! Atomic file replacement: write a sibling temp file, then rename it over
//! the target. A reader sees either the old or the new content.

use crate::error::{Error, RejectReason, Result};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

/// Content written next to its target but not yet visible under the
/// target's name.
#[derive(Debug)]
pub(crate) struct StagedFile {
    tmp: PathBuf,
    target: PathBuf,
}

impl StagedFile {
    /// Write `contents` to a temp file beside `target`. With `mode`, the
    /// temp file gets those permission bits; otherwise it inherits the
    /// permissions of an existing target.
    pub(crate) async fn stage(target: &Path, contents: &[u8], mode: Option<u32>) -> Result<Self> {
        let (parent, name) = match (target.parent(), target.file_name()) {
            (Some(parent), Some(name)) => (parent, name),
            _ => {
                return Err(Error::rejected_logged(
                    RejectReason::WrongKind,
                    format!("'{}' is not a file path", target.display()),
                ))
            }
        };
        let tmp = parent.join(format!(
            ".{}.{}.tmp",
            name.to_string_lossy(),
            Uuid::new_v4().as_simple()
        ));

        let staged = Self {
            tmp,
            target: target.to_path_buf(),
        };
        if let Err(e) = staged.write(contents, mode).await {
            staged.discard().await;
            return Err(e);
        }
        Ok(staged)
    }

    async fn write(&self, contents: &[u8], mode: Option<u32>) -> Result<()> {
        let mut file = tokio::fs::File::create(&self.tmp)
            .await
            .map_err(|e| Error::from_io(e, &self.target))?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = mode {
                tokio::fs::set_permissions(&self.tmp, std::fs::Permissions::from_mode(mode))
                    .await?;
            } else if let Ok(existing) = tokio::fs::metadata(&self.target).await {
                tokio::fs::set_permissions(&self.tmp, existing.permissions()).await?;
            }
        }
        #[cfg(not(unix))]
        let _ = mode;

        Ok(())
    }

    /// Path of the temp file.
    #[cfg(test)]
    pub(crate) fn temp_path(&self) -> &Path {
        &self.tmp
    }

    /// Publish the staged content under the target name.
    pub(crate) async fn commit(self) -> Result<()> {
        match tokio::fs::rename(&self.tmp, &self.target).await {
            Ok(()) => {
                debug!(path = %self.target.display(), "Atomic write committed");
                Ok(())
            }
            Err(e) => {
                let err = Error::from_io(e, &self.target);
                self.discard().await;
                Err(err)
            }
        }
    }

    /// Remove the temp file, ignoring failures.
    pub(crate) async fn discard(&self) {
        let _ = tokio::fs::remove_file(&self.tmp).await;
    }
}

/// Replace `target` with `contents` atomically.
pub(crate) async fn atomic_write(target: &Path, contents: &[u8], mode: Option<u32>) -> Result<()> {
    StagedFile::stage(target, contents, mode).await?.commit().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_atomic_write_creates_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a.txt");
        atomic_write(&target, b"one", None).await.unwrap();
        atomic_write(&target, b"two", None).await.unwrap();
        assert_eq!(tokio::fs::read(&target).await.unwrap(), b"two");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_uncommitted_stage_leaves_target_intact() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("config.ini");
        tokio::fs::write(&target, b"original").await.unwrap();

        let staged = StagedFile::stage(&target, b"half-written", None)
            .await
            .unwrap();
        // Simulated crash: the rename never happens.
        let tmp = staged.temp_path().to_path_buf();
        drop(staged);

        assert_eq!(tokio::fs::read(&target).await.unwrap(), b"original");
        assert!(tmp.exists());
    }

    #[tokio::test]
    async fn test_missing_parent_fails_without_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nope/a.txt");
        let err = atomic_write(&target, b"x", None).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(!target.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_mode_and_inherited_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();

        let script = dir.path().join("run.sh");
        atomic_write(&script, b"#!/bin/sh\n", Some(0o755)).await.unwrap();
        let mode = std::fs::metadata(&script).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);

        let private = dir.path().join("private.txt");
        std::fs::write(&private, b"x").unwrap();
        std::fs::set_permissions(&private, std::fs::Permissions::from_mode(0o600)).unwrap();
        atomic_write(&private, b"y", None).await.unwrap();
        let mode = std::fs::metadata(&private).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
