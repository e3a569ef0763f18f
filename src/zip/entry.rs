use flate2::read::DeflateDecoder;
use std::borrow::Cow;
use std::fmt;
use std::io::Read;
use std::sync::OnceLock;
use tracing::{trace, warn};

use crate::error::{Error, Result};

use super::options::ReadOptions;
use super::parser;
use super::structures::{CompressionMethod, EntryRecord};

/// Upper bound on the output buffer reserved up front from a declared size
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// Lazy view of one archive entry.
///
/// A view borrows the archive buffer, so it cannot outlive the
/// [`ZipFile`](super::ZipFile) or byte slice it came from. Nothing is read
/// or decompressed until [`data`](Self::data) is first called; the result
/// is then cached in the view and returned on every later call.
pub struct EntryView<'a> {
    archive: &'a [u8],
    record: Cow<'a, EntryRecord>,
    options: ReadOptions,
    cache: OnceLock<Vec<u8>>,
}

impl<'a> EntryView<'a> {
    pub(crate) fn new(
        archive: &'a [u8],
        record: Cow<'a, EntryRecord>,
        options: ReadOptions,
    ) -> Self {
        Self {
            archive,
            record,
            options,
            cache: OnceLock::new(),
        }
    }

    pub fn filename(&self) -> &str {
        &self.record.filename
    }

    pub fn record(&self) -> &EntryRecord {
        &self.record
    }

    pub fn is_dir(&self) -> bool {
        self.record.is_dir
    }

    /// Whether the payload has already been materialized
    pub fn is_cached(&self) -> bool {
        self.cache.get().is_some()
    }

    /// Uncompressed payload, decompressed and CRC-checked on first use.
    ///
    /// # Errors
    ///
    /// - [`Error::CorruptArchive`] if the local header is invalid or the data
    ///   runs past the end of the buffer
    /// - [`Error::UnsupportedCompression`] for methods other than STORED and
    ///   DEFLATE
    /// - [`Error::ChecksumMismatch`] if the produced bytes do not match the
    ///   recorded CRC32 or size
    /// - [`Error::EntryTooLarge`] if the declared size exceeds
    ///   [`ReadOptions::max_entry_size`]
    ///
    /// A failed call caches nothing, so it fails the same way again.
    pub fn data(&self) -> Result<&[u8]> {
        if let Some(data) = self.cache.get() {
            return Ok(data);
        }
        let data = self.materialize()?;
        // A concurrent caller may have won the race; both results are identical
        Ok(self.cache.get_or_init(|| data))
    }

    /// Owned copy of the payload
    pub fn data_as_bytes(&self) -> Result<Vec<u8>> {
        self.data().map(<[u8]>::to_vec)
    }

    /// Consume the view and return its payload without copying a cached result
    pub fn into_data(self) -> Result<Vec<u8>> {
        let EntryView {
            archive,
            record,
            options,
            mut cache,
        } = self;
        match cache.take() {
            Some(data) => Ok(data),
            None => EntryView::new(archive, record, options).materialize(),
        }
    }

    /// Decompress and check the entry without keeping the payload.
    pub fn verify(&self) -> Result<()> {
        if self.is_cached() {
            return Ok(());
        }
        self.materialize().map(drop)
    }

    fn materialize(&self) -> Result<Vec<u8>> {
        let record = self.record();

        if let Some(limit) = self.options.entry_size_limit()
            && record.uncompressed_size > limit
        {
            return Err(Error::EntryTooLarge {
                name: record.filename.clone(),
                size: record.uncompressed_size,
                limit,
            });
        }

        let compressed = parser::entry_data(self.archive, record)?;

        let data = match record.compression_method {
            CompressionMethod::Stored => compressed.to_vec(),
            CompressionMethod::Deflate => inflate(compressed, record.uncompressed_size),
            CompressionMethod::Unsupported(method) => {
                return Err(Error::UnsupportedCompression(method));
            }
        };

        let actual = crc32fast::hash(&data);
        if actual != record.crc32 || data.len() as u64 != record.uncompressed_size {
            warn!(
                name = %record.filename,
                expected_crc = record.crc32,
                actual_crc = actual,
                expected_len = record.uncompressed_size,
                actual_len = data.len(),
                "entry failed verification"
            );
            return Err(Error::ChecksumMismatch {
                expected: record.crc32,
                actual,
            });
        }

        trace!(
            name = %record.filename,
            method = record.compression_method.as_u16(),
            compressed = record.compressed_size,
            uncompressed = data.len(),
            "materialized entry"
        );
        Ok(data)
    }
}

/// Raw-inflate `compressed`, reading at most one byte past `expected`.
///
/// A broken stream yields whatever was inflated before the error; the caller's
/// size and CRC checks reject it.
fn inflate(compressed: &[u8], expected: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(expected.min(MAX_PREALLOC) as usize);
    let mut decoder = DeflateDecoder::new(compressed).take(expected.saturating_add(1));
    if let Err(e) = decoder.read_to_end(&mut out) {
        trace!(error = %e, inflated = out.len(), "deflate stream ended with an error");
    }
    out
}

impl fmt::Debug for EntryView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryView")
            .field("filename", &self.record.filename)
            .field("compression_method", &self.record.compression_method)
            .field("uncompressed_size", &self.record.uncompressed_size)
            .field("cached", &self.is_cached())
            .finish()
    }
}
