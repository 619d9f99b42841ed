use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Contents of `<stem>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ScriptMetadata {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "cron_schedule")]
    pub schedule: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// Load a metadata record. Missing or unreadable records yield `None`.
pub(crate) async fn load(path: &Path) -> Option<ScriptMetadata> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Could not read script metadata");
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(meta) => Some(meta),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Ignoring malformed script metadata");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_legacy_field_name() {
        let raw = r#"{
            "name": "backup",
            "description": "nightly",
            "cron_schedule": "0 3 * * *",
            "created_at": "2024-01-02T03:04:05Z",
            "modified_at": "2024-01-02T03:04:05Z"
        }"#;
        let meta: ScriptMetadata = serde_json::from_str(raw).unwrap();
        assert_eq!(meta.schedule, "0 3 * * *");
        assert_eq!(meta.description, "nightly");
    }

    #[tokio::test]
    async fn test_load_tolerates_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.json");
        assert!(load(&path).await.is_none());
        tokio::fs::write(&path, b"{not json").await.unwrap();
        assert!(load(&path).await.is_none());
    }
}
