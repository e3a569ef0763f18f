use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};

/// Read a whole archive file into memory.
///
/// The central directory sits at the end of the file, so nothing can be
/// parsed until every byte is addressable.
pub fn read_archive(path: &Path) -> Result<Vec<u8>> {
    let data = std::fs::read(path).map_err(|e| map_open_error(path, e))?;
    debug!(path = %path.display(), size = data.len(), "read archive");
    Ok(data)
}

/// Async counterpart of [`read_archive`] for callers running on tokio.
pub async fn read_archive_async(path: &Path) -> Result<Vec<u8>> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| map_open_error(path, e))?;
    debug!(path = %path.display(), size = data.len(), "read archive");
    Ok(data)
}

fn map_open_error(path: &Path, e: std::io::Error) -> Error {
    if e.kind() == ErrorKind::NotFound {
        Error::NotFound(path.to_path_buf())
    } else {
        Error::Io(e)
    }
}
