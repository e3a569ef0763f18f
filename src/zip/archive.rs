use std::borrow::Cow;
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};
use crate::io;

use super::entry::EntryView;
use super::options::ReadOptions;
use super::parser::ArchiveIndex;
use super::structures::EntryRecord;

/// An open ZIP archive held in memory.
///
/// The handle owns the archive bytes and the parsed central directory.
/// Entries are handed out as [`EntryView`]s that borrow the handle, so the
/// borrow checker keeps the handle open for as long as any view is alive.
/// After [`close`](Self::close) every operation returns [`Error::Closed`].
///
/// ## Example
///
/// ```no_run
/// use picoio::ZipFile;
///
/// fn main() -> picoio::Result<()> {
///     let archive = ZipFile::open("archive.zip")?;
///     for record in archive.entries()? {
///         println!("{} ({} bytes)", record.filename, record.uncompressed_size);
///     }
///
///     let readme = archive.by_name("README.md")?;
///     println!("{}", String::from_utf8_lossy(readme.data()?));
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct ZipFile {
    state: Option<OpenArchive>,
    options: ReadOptions,
}

#[derive(Debug)]
struct OpenArchive {
    buffer: Vec<u8>,
    index: ArchiveIndex,
}

impl ZipFile {
    /// Take ownership of `bytes` and parse its central directory.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        Self::from_bytes_with_options(bytes, ReadOptions::default())
    }

    pub fn from_bytes_with_options(
        bytes: impl Into<Vec<u8>>,
        options: ReadOptions,
    ) -> Result<Self> {
        let buffer = bytes.into();
        let index = ArchiveIndex::parse_with_options(&buffer, &options)?;
        debug!(entries = index.len(), size = buffer.len(), "opened archive");
        Ok(Self {
            state: Some(OpenArchive { buffer, index }),
            options,
        })
    }

    /// Read the file at `path` into memory and parse it.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the path does not exist,
    /// [`Error::CorruptArchive`] if it is not a readable ZIP archive.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(path, ReadOptions::default())
    }

    pub fn open_with_options(path: impl AsRef<Path>, options: ReadOptions) -> Result<Self> {
        let buffer = io::read_archive(path.as_ref())?;
        Self::from_bytes_with_options(buffer, options)
    }

    /// Open the archive at `path`, run `f` on it, and close it again.
    ///
    /// The handle is closed whether `f` succeeds or fails.
    pub fn with_path<T, F>(path: impl AsRef<Path>, f: F) -> Result<T>
    where
        F: FnOnce(&ZipFile) -> Result<T>,
    {
        let mut archive = Self::open(path)?;
        let result = f(&archive);
        archive.close()?;
        result
    }

    fn state(&self) -> Result<&OpenArchive> {
        self.state.as_ref().ok_or(Error::Closed)
    }

    /// Central directory records in archive order
    pub fn entries(&self) -> Result<&[EntryRecord]> {
        Ok(self.state()?.index.records())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.state()?.index.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.state()?.index.is_empty())
    }

    /// Archive-level comment
    pub fn comment(&self) -> Result<&str> {
        Ok(self.state()?.index.comment())
    }

    /// The raw archive bytes
    pub fn as_bytes(&self) -> Result<&[u8]> {
        Ok(&self.state()?.buffer)
    }

    /// First entry named exactly `name`.
    pub fn by_name(&self, name: &str) -> Result<EntryView<'_>> {
        let state = self.state()?;
        let (_, record) = state
            .index
            .find(name)
            .ok_or_else(|| Error::EntryNotFound(name.to_string()))?;
        Ok(self.view(state, record))
    }

    /// Entry at position `index` in the central directory.
    pub fn by_index(&self, index: usize) -> Result<EntryView<'_>> {
        let state = self.state()?;
        let record = state
            .index
            .get(index)
            .ok_or_else(|| Error::EntryNotFound(format!("#{index}")))?;
        Ok(self.view(state, record))
    }

    /// One view per record, in archive order, directories included.
    pub fn extract_all(&self) -> Result<Vec<EntryView<'_>>> {
        let state = self.state()?;
        Ok(state
            .index
            .records()
            .iter()
            .map(|record| self.view(state, record))
            .collect())
    }

    /// Views of every entry that is not a directory.
    pub fn files(&self) -> Result<impl Iterator<Item = EntryView<'_>> + '_> {
        let state = self.state()?;
        Ok(state
            .index
            .records()
            .iter()
            .filter(|record| !record.is_dir)
            .map(move |record| self.view(state, record)))
    }

    /// Release the archive buffer.
    ///
    /// # Errors
    ///
    /// [`Error::Closed`] if the handle was already closed.
    pub fn close(&mut self) -> Result<()> {
        let state = self.state.take().ok_or(Error::Closed)?;
        debug!(size = state.buffer.len(), "closed archive");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_none()
    }

    fn view<'a>(&self, state: &'a OpenArchive, record: &'a EntryRecord) -> EntryView<'a> {
        EntryView::new(&state.buffer, Cow::Borrowed(record), self.options)
    }
}

/// Parse `data` and return a view of every entry, in archive order.
///
/// Equivalent to opening a [`ZipFile`] and calling
/// [`extract_all`](ZipFile::extract_all), but borrows the caller's buffer
/// instead of copying it. Payloads are decompressed lazily, per view.
///
/// ```
/// // The smallest valid archive: an empty end of central directory record
/// let empty = b"PK\x05\x06\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0";
/// assert!(picoio::extract_zip(empty).unwrap().is_empty());
/// ```
pub fn extract_zip(data: &[u8]) -> Result<Vec<EntryView<'_>>> {
    extract_zip_with_options(data, ReadOptions::default())
}

pub fn extract_zip_with_options(data: &[u8], options: ReadOptions) -> Result<Vec<EntryView<'_>>> {
    let index = ArchiveIndex::parse_with_options(data, &options)?;
    Ok(index
        .into_records()
        .into_iter()
        .map(|record| EntryView::new(data, Cow::Owned(record), options))
        .collect())
}
