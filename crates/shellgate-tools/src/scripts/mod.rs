//! Named shell scripts with paired metadata
//!
//! Each script is stored as `<stem>.sh` plus `<stem>.json` under one root.
//! Saves write the body before the metadata and deletes remove the metadata
//! before the body, so an interrupted operation can leave a body without a
//! record but never a record without a body.

mod metadata;
mod validate;

#[cfg(test)]
mod tests;

pub use validate::{
    validate_schedule, validate_script_name, MAX_STEM_LEN, METADATA_EXTENSION, SCRIPT_EXTENSION,
};

use crate::error::{Error, Result};
use crate::fs_util::atomic_write;
use crate::path_guard::PathGuard;
use chrono::{DateTime, Utc};
use metadata::ScriptMetadata;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;

/// Mode applied to script bodies.
pub const SCRIPT_MODE: u32 = 0o755;

/// Listing entry for one script.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ScriptInfo {
    /// Stem without the extension
    pub name: String,
    /// File name of the body
    pub filename: String,
    /// Free-form description
    pub description: String,
    /// Five-field schedule, empty when unscheduled
    pub schedule: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub modified_at: DateTime<Utc>,
    /// Body size in bytes
    pub size: u64,
}

/// Filesystem-backed script store.
#[derive(Debug, Clone)]
pub struct ScriptStore {
    root: PathBuf,
    guard: PathGuard,
}

impl ScriptStore {
    /// Create a store rooted at `root`. The directory is created on first
    /// use, not here.
    pub fn new(root: impl Into<PathBuf>, guard: PathGuard) -> Self {
        Self {
            root: root.into(),
            guard,
        }
    }

    /// Configured storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn ensure_root(&self) -> Result<PathBuf> {
        if let Err(e) = tokio::fs::create_dir_all(&self.root).await {
            error!(root = %self.root.display(), error = %e, "Cannot create script directory");
            return Err(Error::from_io(e, &self.root));
        }
        tokio::fs::canonicalize(&self.root)
            .await
            .map_err(|e| Error::from_io(e, &self.root))
    }

    fn pair_paths(&self, root: &Path, stem: &str) -> Result<(PathBuf, PathBuf)> {
        let body = self
            .guard
            .resolve_within(&format!("{stem}{SCRIPT_EXTENSION}"), root)?;
        let meta = self
            .guard
            .resolve_within(&format!("{stem}{METADATA_EXTENSION}"), root)?;
        Ok((body, meta))
    }

    /// All scripts, ordered by name.
    pub async fn list(&self) -> Result<Vec<ScriptInfo>> {
        let root = self.ensure_root().await?;
        let mut dir = tokio::fs::read_dir(&root)
            .await
            .map_err(|e| Error::from_io(e, &root))?;

        let mut bodies = Vec::new();
        let mut records = HashSet::new();
        while let Some(entry) = dir.next_entry().await.map_err(|e| Error::from_io(e, &root))? {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if let Some(stem) = file_name.strip_suffix(METADATA_EXTENSION) {
                records.insert(stem.to_string());
            } else if validate_script_name(&file_name).is_ok() {
                bodies.push((file_name, entry));
            } else {
                debug!(file = %file_name, "Skipping non-script entry");
            }
        }
        bodies.sort_by(|a, b| a.0.cmp(&b.0));

        let mut scripts = Vec::with_capacity(bodies.len());
        for (file_name, entry) in bodies {
            let stat = match entry.metadata().await {
                Ok(stat) => stat,
                Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                    debug!(file = %file_name, "Permission denied, skipping script");
                    continue;
                }
                Err(e) => {
                    warn!(file = %file_name, error = %e, "Cannot stat script, skipping");
                    continue;
                }
            };
            if !stat.is_file() {
                continue;
            }

            let stem = file_name
                .strip_suffix(SCRIPT_EXTENSION)
                .unwrap_or(&file_name)
                .to_string();
            records.remove(&stem);

            let modified: DateTime<Utc> = stat
                .modified()
                .map(DateTime::from)
                .unwrap_or_else(|_| Utc::now());
            let created: DateTime<Utc> = stat.created().map(DateTime::from).unwrap_or(modified);

            let record =
                metadata::load(&root.join(format!("{stem}{METADATA_EXTENSION}"))).await;
            let info = match record {
                Some(meta) => ScriptInfo {
                    name: stem,
                    filename: file_name,
                    description: meta.description,
                    schedule: meta.schedule,
                    created_at: meta.created_at,
                    modified_at: meta.modified_at,
                    size: stat.len(),
                },
                None => ScriptInfo {
                    name: stem,
                    filename: file_name,
                    description: String::new(),
                    schedule: String::new(),
                    created_at: created,
                    modified_at: modified,
                    size: stat.len(),
                },
            };
            scripts.push(info);
        }

        for orphan in records {
            debug!(record = %orphan, "Metadata record without script body");
        }
        Ok(scripts)
    }

    /// Create or replace a script.
    pub async fn save(
        &self,
        name: &str,
        body: &str,
        description: &str,
        schedule: &str,
    ) -> Result<ScriptInfo> {
        let stem = validate_script_name(name).map_err(|e| log_rejection(name, e))?;
        let schedule = validate_schedule(schedule)
            .map_err(|e| log_rejection(name, e))?
            .unwrap_or_default();

        let root = self.ensure_root().await?;
        let (body_path, meta_path) = self.pair_paths(&root, stem)?;

        let now = Utc::now();
        let created_at = metadata::load(&meta_path)
            .await
            .map(|m| m.created_at)
            .unwrap_or(now);
        let record = ScriptMetadata {
            name: stem.to_string(),
            description: description.to_string(),
            schedule,
            created_at,
            modified_at: now,
        };

        atomic_write(&body_path, body.as_bytes(), Some(SCRIPT_MODE)).await?;
        let encoded = serde_json::to_vec_pretty(&record)?;
        if let Err(e) = atomic_write(&meta_path, &encoded, None).await {
            error!(script = %name, error = %e, "Script body saved but metadata write failed");
            return Err(e);
        }

        info!(script = %name, bytes = body.len(), "Script saved");
        Ok(ScriptInfo {
            name: record.name,
            filename: name.to_string(),
            description: record.description,
            schedule: record.schedule,
            created_at: record.created_at,
            modified_at: record.modified_at,
            size: body.len() as u64,
        })
    }

    /// Script body.
    pub async fn read(&self, name: &str) -> Result<String> {
        let path = self.script_path(name).await?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| not_found_as(name, Error::from_io(e, &path)))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Remove a script and its metadata.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let stem = validate_script_name(name).map_err(|e| log_rejection(name, e))?;
        let root = self.ensure_root().await?;
        let (body_path, meta_path) = self.pair_paths(&root, stem)?;

        let had_meta = remove_if_present(&meta_path).await?;
        let had_body = remove_if_present(&body_path).await?;
        if !had_meta && !had_body {
            return Err(Error::NotFound(name.to_string()));
        }
        info!(script = %name, "Script deleted");
        Ok(())
    }

    /// Absolute path of an existing script body.
    pub async fn script_path(&self, name: &str) -> Result<PathBuf> {
        let stem = validate_script_name(name).map_err(|e| log_rejection(name, e))?;
        let root = self.ensure_root().await?;
        let (body_path, _) = self.pair_paths(&root, stem)?;
        match tokio::fs::metadata(&body_path).await {
            Ok(stat) if stat.is_file() => Ok(body_path),
            Ok(_) => Err(Error::NotFound(name.to_string())),
            Err(e) => Err(not_found_as(name, Error::from_io(e, &body_path))),
        }
    }
}

async fn remove_if_present(path: &Path) -> Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::from_io(e, path)),
    }
}

fn not_found_as(name: &str, err: Error) -> Error {
    match err {
        Error::NotFound(_) => Error::NotFound(name.to_string()),
        other => other,
    }
}

fn log_rejection(name: &str, err: Error) -> Error {
    if let Error::Rejected { reason, detail } = &err {
        warn!(script = %name, reason = %reason, detail = %detail, "Script request rejected");
    }
    err
}
