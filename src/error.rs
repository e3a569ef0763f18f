use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for archive operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while opening, parsing, or extracting a ZIP archive.
///
/// Structural failures abort the whole parse. Entry-level failures
/// (`UnsupportedCompression`, `ChecksumMismatch`, `EntryTooLarge`) only
/// affect the entry being materialized.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Archive not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),

    #[error("Unsupported compression method: {0} (only STORED and DEFLATE are supported)")]
    UnsupportedCompression(u16),

    #[error("CRC mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("Entry not found in archive: {0}")]
    EntryNotFound(String),

    #[error("Archive handle is closed")]
    Closed,

    #[error("Entry {name} is too large: {size} bytes exceeds limit of {limit} bytes")]
    EntryTooLarge { name: String, size: u64, limit: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        Error::CorruptArchive(msg.into())
    }
}
