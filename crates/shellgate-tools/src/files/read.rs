use super::FileBrowser;
use crate::error::{Error, RejectReason, Result};
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

impl FileBrowser {
    /// Read a whole file. Files over the limit are refused, never truncated.
    pub async fn read_file(&self, raw: &str) -> Result<Vec<u8>> {
        let path = self.guard.resolve(raw)?;

        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| Error::from_io(e, &path))?;
        if meta.is_dir() {
            return Err(Error::rejected_logged(
                RejectReason::WrongKind,
                format!("'{}' is a directory", path.display()),
            ));
        }
        if meta.len() > self.max_read_bytes {
            info!(path = %path.display(), size = meta.len(), "File too large to read");
            return Err(Error::TooLarge {
                size: meta.len(),
                limit: self.max_read_bytes,
            });
        }

        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| Error::from_io(e, &path))?;
        let mut buf = Vec::with_capacity(meta.len() as usize);
        // One byte past the limit detects growth since the stat.
        file.take(self.max_read_bytes + 1)
            .read_to_end(&mut buf)
            .await
            .map_err(|e| Error::from_io(e, &path))?;
        if buf.len() as u64 > self.max_read_bytes {
            return Err(Error::TooLarge {
                size: buf.len() as u64,
                limit: self.max_read_bytes,
            });
        }

        debug!(path = %path.display(), bytes = buf.len(), "File read");
        Ok(buf)
    }
}
