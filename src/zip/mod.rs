//! ZIP archive parsing and extraction.
//!
//! This module reads ZIP archives held entirely in memory, supporting both
//! the standard format and ZIP64 extensions for large archives.
//!
//! ## Architecture
//!
//! - [`structures`]: Data structures representing ZIP format elements (EOCD, file headers, etc.)
//! - [`parser`]: Parsing of the central directory into an [`ArchiveIndex`]
//! - [`EntryView`]: Lazy, checksum-verified decompression of one entry
//! - [`ZipFile`] and [`extract_zip`]: The user-facing API
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! The EOCD is read first, then the Central Directory. Listing an archive
//! never touches entry data; each entry is decompressed only when asked for.
//!
//! ## Supported Features
//!
//! - Standard ZIP format (PKZIP APPNOTE 6.3.x compatible)
//! - ZIP64 extensions for files > 4GB
//! - STORED (no compression) method
//! - DEFLATE compression method
//! - UTF-8 file names (flag bit 11), CP437 otherwise
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - No BZIP2, LZMA, or other compression methods
//! - No writing

mod archive;
mod cp437;
mod entry;
mod options;
pub mod parser;
pub mod structures;

pub use archive::{ZipFile, extract_zip, extract_zip_with_options};
pub use entry::EntryView;
pub use options::ReadOptions;
pub use parser::ArchiveIndex;
pub use structures::{CompressionMethod, EntryRecord};
