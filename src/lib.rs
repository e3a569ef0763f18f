//! # picoio
//!
//! An in-memory ZIP archive reader.
//!
//! An archive is handed over as one complete byte buffer, either directly or
//! read whole from a file. Its central directory is parsed up front; each
//! entry's payload is decompressed only when requested and is always checked
//! against the CRC32 recorded in the archive.
//!
//! ## Features
//!
//! - Parse archives from a byte slice ([`extract_zip`]) or an owned handle ([`ZipFile`])
//! - Support for ZIP64 format (archives larger than 4GB)
//! - Support for STORED (uncompressed) and DEFLATE compression methods
//! - Lazy per-entry decompression with caching
//! - Size limits for untrusted input ([`ReadOptions`])
//!
//! ## Example
//!
//! ```no_run
//! use picoio::extract_zip;
//!
//! fn main() -> anyhow::Result<()> {
//!     let bytes = std::fs::read("archive.zip")?;
//!
//!     for entry in extract_zip(&bytes)? {
//!         if !entry.is_dir() {
//!             println!("{}: {} bytes", entry.filename(), entry.data()?.len());
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod error;
pub mod io;
pub mod zip;

pub use cli::Cli;
pub use error::{Error, Result};
pub use zip::{
    ArchiveIndex, CompressionMethod, EntryRecord, EntryView, ReadOptions, ZipFile, extract_zip,
    extract_zip_with_options,
};
