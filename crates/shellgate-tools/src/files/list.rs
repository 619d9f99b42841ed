use super::{DirectoryEntry, EntryKind, FileBrowser};
use crate::error::{Error, RejectReason, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

impl FileBrowser {
    /// List a directory, sorted by name. Entries that cannot be inspected
    /// are skipped rather than failing the whole listing.
    pub async fn list_directory(&self, raw: &str) -> Result<Vec<DirectoryEntry>> {
        let dir_path = self.guard.resolve(raw)?;

        let meta = tokio::fs::metadata(&dir_path)
            .await
            .map_err(|e| Error::from_io(e, &dir_path))?;
        if !meta.is_dir() {
            return Err(Error::rejected_logged(
                RejectReason::WrongKind,
                format!("'{}' is not a directory", dir_path.display()),
            ));
        }

        let mut entries = Vec::new();
        let mut reader = tokio::fs::read_dir(&dir_path)
            .await
            .map_err(|e| Error::from_io(e, &dir_path))?;

        loop {
            let entry = match reader.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(path = %dir_path.display(), error = %e, "Directory read interrupted");
                    break;
                }
            };
            let path = entry.path();

            let stat = match tokio::fs::metadata(&path).await {
                Ok(stat) => stat,
                Err(e)
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::PermissionDenied | std::io::ErrorKind::NotFound
                    ) =>
                {
                    debug!(path = %path.display(), error = %e, "Skipping entry");
                    continue;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot stat entry, skipping");
                    continue;
                }
            };

            let kind = if stat.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            entries.push(DirectoryEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path,
                kind,
                size: if stat.is_dir() { 0 } else { stat.len() },
                modified: stat.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(path = %dir_path.display(), count = entries.len(), "Directory listed");
        Ok(entries)
    }
}
