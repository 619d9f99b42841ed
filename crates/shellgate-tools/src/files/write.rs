use super::FileBrowser;
use crate::error::{Error, RejectReason, Result};
use crate::fs_util::atomic_write;
use tracing::info;

impl FileBrowser {
    /// Replace a file's content atomically. The parent directory must exist.
    pub async fn write_file(&self, raw: &str, content: &[u8]) -> Result<()> {
        let path = self.guard.resolve(raw)?;
        if let Ok(meta) = tokio::fs::metadata(&path).await {
            if meta.is_dir() {
                return Err(Error::rejected_logged(
                    RejectReason::WrongKind,
                    format!("'{}' is a directory", path.display()),
                ));
            }
        }
        atomic_write(&path, content, None).await?;
        info!(path = %path.display(), bytes = content.len(), "File written");
        Ok(())
    }

    /// Create a directory and any missing parents. Existing directories are
    /// left alone.
    pub async fn create_directory(&self, raw: &str) -> Result<()> {
        let path = self.guard.resolve(raw)?;
        match tokio::fs::create_dir_all(&path).await {
            Ok(()) => {
                info!(path = %path.display(), "Directory created");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(Error::rejected_logged(
                RejectReason::WrongKind,
                format!("'{}' exists and is not a directory", path.display()),
            )),
            Err(e) => Err(Error::from_io(e, &path)),
        }
    }
}
