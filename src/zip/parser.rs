//! Low-level ZIP archive parser.
//!
//! This module handles the binary parsing of ZIP file structures from a
//! complete in-memory buffer.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the buffer's end
//! 2. If ZIP64, read the ZIP64 EOCD for large file support
//! 3. Read the Central Directory to get metadata for all files
//! 4. For extraction, read each file's Local File Header to find its data
//!
//! Nothing here decompresses or checks CRCs; listing an archive only touches
//! its tail.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;
use tracing::debug;

use crate::error::{Error, Result};

use super::cp437;
use super::options::ReadOptions;
use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: usize = 65535;

/// Parsed central directory of an archive.
///
/// Built once from a buffer and immutable afterwards. Record offsets are
/// absolute positions in the buffer the index was parsed from, so the index
/// is only meaningful together with that buffer.
#[derive(Debug, Clone, Default)]
pub struct ArchiveIndex {
    records: Vec<EntryRecord>,
    comment: String,
    base_offset: u64,
}

impl ArchiveIndex {
    /// Parse the central directory of `data` with no limits.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::parse_with_options(data, &ReadOptions::default())
    }

    /// Parse the central directory of `data`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptArchive`] if no EOCD record is found in the
    /// trailing search window, if the directory lies outside the buffer, or
    /// if any directory record is malformed or truncated. No partial listing
    /// is returned.
    pub fn parse_with_options(data: &[u8], options: &ReadOptions) -> Result<Self> {
        let (eocd, eocd_offset) = find_eocd(data)?;

        let comment_start = eocd_offset + EndOfCentralDirectory::SIZE;
        let comment_end = (comment_start + eocd.comment_len as usize).min(data.len());
        let comment = cp437::decode_field(&data[comment_start..comment_end], false);

        // Get Central Directory info, using ZIP64 if needed. A saturated
        // field is also a legal plain value (exactly 65535 entries), so ZIP64
        // is only taken when the locator is actually there.
        let zip64 = eocd.is_zip64() && has_zip64_locator(data, eocd_offset);
        let (cd_offset, cd_size, total_entries, cd_end) = if zip64 {
            let (eocd64, eocd64_offset) = read_zip64_eocd(data, eocd_offset)?;
            debug!(
                entries = eocd64.total_entries,
                cd_offset = eocd64.cd_offset,
                "ZIP64 end of central directory"
            );
            (
                eocd64.cd_offset,
                eocd64.cd_size,
                eocd64.total_entries,
                eocd64_offset as u64,
            )
        } else {
            (
                eocd.cd_offset as u64,
                eocd.cd_size as u64,
                eocd.total_entries as u64,
                eocd_offset as u64,
            )
        };

        if let Some(limit) = options.entry_count_limit()
            && total_entries > limit
        {
            return Err(Error::corrupt(format!(
                "archive declares {total_entries} entries, limit is {limit}"
            )));
        }

        let base_offset = locate_central_directory(data, cd_offset, cd_size, cd_end)?;
        let cd_start = (base_offset + cd_offset) as usize;

        // Records are walked against the rest of the buffer, not just
        // `cd_size`, so a slightly wrong directory size is tolerated.
        let mut cursor = Cursor::new(&data[cd_start..]);
        let available = (data.len() - cd_start) as u64;
        let capacity = total_entries.min(available / CDFH_MIN_SIZE as u64);
        let mut records = Vec::with_capacity(capacity as usize);

        for index in 0..total_entries {
            let record = parse_cdfh(&mut cursor, base_offset).map_err(|e| match e {
                Error::CorruptArchive(msg) => {
                    Error::corrupt(format!("central directory record {index}: {msg}"))
                }
                other => other,
            })?;
            records.push(record);
        }

        debug!(
            entries = records.len(),
            base_offset,
            cd_offset,
            cd_size,
            "parsed central directory"
        );

        Ok(Self {
            records,
            comment,
            base_offset,
        })
    }

    /// Records in central directory order
    pub fn records(&self) -> &[EntryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Archive comment from the EOCD record
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Number of bytes preceding the archive proper (e.g. a self-extractor stub)
    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// First record with exactly this name, with its position
    pub fn find(&self, name: &str) -> Option<(usize, &EntryRecord)> {
        self.records
            .iter()
            .enumerate()
            .find(|(_, record)| record.filename == name)
    }

    pub fn get(&self, index: usize) -> Option<&EntryRecord> {
        self.records.get(index)
    }

    pub(crate) fn into_records(self) -> Vec<EntryRecord> {
        self.records
    }
}

/// Find and parse the End of Central Directory record.
///
/// Handles both the simple case (no comment) and archives with comments by
/// searching backwards for the signature within the last
/// `22 + 65535` bytes. A candidate whose comment length exactly reaches the
/// end of the buffer is preferred; otherwise the last candidate whose
/// comment fits is taken, which tolerates trailing junk.
///
/// # Returns
///
/// A tuple of (EOCD record, offset of EOCD in the buffer).
pub fn find_eocd(data: &[u8]) -> Result<(EndOfCentralDirectory, usize)> {
    let size = EndOfCentralDirectory::SIZE;
    if data.len() < size {
        return Err(Error::corrupt(
            "buffer too small to hold an end of central directory record",
        ));
    }

    // Optimization: first try the simple case where there's no comment.
    let offset = data.len() - size;
    if &data[offset..offset + 4] == EndOfCentralDirectory::SIGNATURE
        && data[offset + 20..offset + 22] == [0, 0]
    {
        debug!(offset, "end of central directory at end of buffer");
        return Ok((EndOfCentralDirectory::from_bytes(&data[offset..])?, offset));
    }

    let search_start = data.len().saturating_sub(MAX_COMMENT_SIZE + size);
    let mut fallback = None;

    for i in (search_start..=data.len() - size).rev() {
        if &data[i..i + 4] != EndOfCentralDirectory::SIGNATURE {
            continue;
        }
        let comment_len = u16::from_le_bytes([data[i + 20], data[i + 21]]) as usize;
        let remaining = data.len() - i - size;

        if comment_len == remaining {
            debug!(offset = i, comment_len, "end of central directory found");
            return Ok((EndOfCentralDirectory::from_bytes(&data[i..])?, i));
        }
        if comment_len < remaining && fallback.is_none() {
            fallback = Some(i);
        }
    }

    match fallback {
        Some(i) => {
            debug!(
                offset = i,
                "end of central directory found before trailing data"
            );
            Ok((EndOfCentralDirectory::from_bytes(&data[i..])?, i))
        }
        None => Err(Error::corrupt(
            "end of central directory signature not found",
        )),
    }
}

/// Whether a ZIP64 EOCD locator signature sits right before the EOCD.
fn has_zip64_locator(data: &[u8], eocd_offset: usize) -> bool {
    eocd_offset
        .checked_sub(Zip64EOCDLocator::SIZE)
        .is_some_and(|start| &data[start..start + 4] == Zip64EOCDLocator::SIGNATURE)
}

/// Read the ZIP64 End of Central Directory record.
///
/// The locator sits immediately before the regular EOCD. The record it
/// points to is tried first at its declared offset, then directly before the
/// locator for archives that carry prepended data.
///
/// # Returns
///
/// The parsed ZIP64 EOCD and its offset in the buffer.
fn read_zip64_eocd(data: &[u8], eocd_offset: usize) -> Result<(Zip64EOCD, usize)> {
    let locator_offset = eocd_offset
        .checked_sub(Zip64EOCDLocator::SIZE)
        .ok_or_else(|| Error::corrupt("missing ZIP64 end of central directory locator"))?;
    let locator = Zip64EOCDLocator::from_bytes(&data[locator_offset..eocd_offset])?;

    let declared = usize::try_from(locator.eocd64_offset).ok();
    let adjacent = locator_offset.checked_sub(Zip64EOCD::MIN_SIZE);

    for candidate in [declared, adjacent].into_iter().flatten() {
        if candidate
            .checked_add(Zip64EOCD::MIN_SIZE)
            .is_none_or(|end| end > locator_offset)
        {
            continue;
        }
        if let Ok(eocd64) = Zip64EOCD::from_bytes(&data[candidate..locator_offset]) {
            return Ok((eocd64, candidate));
        }
    }

    Err(Error::corrupt("invalid ZIP64 end of central directory record"))
}

/// Work out where the central directory starts in the buffer.
///
/// Returns the base offset to add to every offset recorded in the archive:
/// zero for a plain archive, or the length of any data prepended to it.
fn locate_central_directory(
    data: &[u8],
    cd_offset: u64,
    cd_size: u64,
    cd_end: u64,
) -> Result<u64> {
    let out_of_range = || {
        Error::corrupt(format!(
            "central directory (offset {cd_offset}, size {cd_size}) lies outside the archive"
        ))
    };

    let fits = |base: u64| {
        base.checked_add(cd_offset)
            .and_then(|start| start.checked_add(cd_size))
            .is_some_and(|end| end <= cd_end)
    };
    let starts_with_header = |base: u64| {
        cd_size == 0
            || usize::try_from(base + cd_offset)
                .ok()
                .and_then(|start| data.get(start..start + 4))
                .is_some_and(|sig| sig == CDFH_SIGNATURE)
    };

    if fits(0) && starts_with_header(0) {
        return Ok(0);
    }

    // Offsets are relative to an archive that does not start at byte 0
    let base = cd_end
        .checked_sub(cd_size)
        .and_then(|start| start.checked_sub(cd_offset))
        .ok_or_else(out_of_range)?;

    if base > 0 && fits(base) && starts_with_header(base) {
        debug!(base, "archive starts after prepended data");
        return Ok(base);
    }

    if fits(0) {
        return Err(Error::corrupt(format!(
            "no central directory header at offset {cd_offset}"
        )));
    }
    Err(out_of_range())
}

/// Parse a Central Directory File Header from a cursor.
///
/// The CDFH contains metadata about a file in the archive, including its
/// name, sizes, and the location of its local header.
fn parse_cdfh(cursor: &mut Cursor<&[u8]>, base_offset: u64) -> Result<EntryRecord> {
    let available = remaining(cursor);
    if available < CDFH_MIN_SIZE {
        return Err(Error::corrupt(format!(
            "truncated header: {available} bytes left, need {CDFH_MIN_SIZE}"
        )));
    }

    // Read and verify the signature (PK\x01\x02)
    let sig = cursor.read_u32::<LittleEndian>()?.to_le_bytes();
    if sig != CDFH_SIGNATURE {
        return Err(Error::corrupt(
            "invalid central directory file header signature",
        ));
    }

    let _version_made_by = cursor.read_u16::<LittleEndian>()?;
    let _version_needed = cursor.read_u16::<LittleEndian>()?;
    let flags = cursor.read_u16::<LittleEndian>()?;
    let compression_method = cursor.read_u16::<LittleEndian>()?;
    let last_mod_time = cursor.read_u16::<LittleEndian>()?;
    let last_mod_date = cursor.read_u16::<LittleEndian>()?;
    let crc32 = cursor.read_u32::<LittleEndian>()?;
    let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let mut uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let file_name_length = cursor.read_u16::<LittleEndian>()? as usize;
    let extra_field_length = cursor.read_u16::<LittleEndian>()? as usize;
    let file_comment_length = cursor.read_u16::<LittleEndian>()? as usize;
    let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
    let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
    let _external_attrs = cursor.read_u32::<LittleEndian>()?;
    let mut lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

    let variable_length = file_name_length + extra_field_length + file_comment_length;
    if remaining(cursor) < variable_length {
        return Err(Error::corrupt(format!(
            "variable fields ({variable_length} bytes) run past the end of the archive"
        )));
    }

    let utf8 = flags & FLAG_UTF8 != 0;
    let name_bytes = take(cursor, file_name_length);
    let filename = cp437::decode_field(name_bytes, utf8).replace('\\', "/");
    let is_dir = filename.ends_with('/');

    // ZIP64 extended information: each 64-bit value is present only when
    // the corresponding header field is saturated.
    let mut extra = Cursor::new(take(cursor, extra_field_length));
    while remaining(&extra) >= 4 {
        let header_id = extra.read_u16::<LittleEndian>()?;
        let field_size = extra.read_u16::<LittleEndian>()? as usize;
        let field_end = extra.position() + field_size.min(remaining(&extra)) as u64;

        if header_id == ZIP64_EXTRA_ID {
            if uncompressed_size == 0xFFFFFFFF && extra.position() + 8 <= field_end {
                uncompressed_size = extra.read_u64::<LittleEndian>()?;
            }
            if compressed_size == 0xFFFFFFFF && extra.position() + 8 <= field_end {
                compressed_size = extra.read_u64::<LittleEndian>()?;
            }
            if lfh_offset == 0xFFFFFFFF && extra.position() + 8 <= field_end {
                lfh_offset = extra.read_u64::<LittleEndian>()?;
            }
        }
        extra.set_position(field_end);
    }

    let comment = cp437::decode_field(take(cursor, file_comment_length), utf8);

    let local_header_offset = lfh_offset
        .checked_add(base_offset)
        .ok_or_else(|| Error::corrupt("local header offset overflows"))?;

    Ok(EntryRecord {
        filename,
        comment,
        compression_method: CompressionMethod::from_u16(compression_method),
        compressed_size,
        uncompressed_size,
        crc32,
        local_header_offset,
        flags,
        last_mod_time,
        last_mod_date,
        is_dir,
    })
}

/// Slice of the buffer holding an entry's compressed data.
///
/// The Local File Header (LFH) has variable-length fields (filename, extra
/// field) that may differ from the Central Directory entry, so the LFH is
/// re-read to find where the data actually begins.
///
/// # Errors
///
/// Returns [`Error::CorruptArchive`] if the LFH signature is wrong or the
/// buffer ends before `compressed_size` bytes of data.
pub fn entry_data<'a>(data: &'a [u8], record: &EntryRecord) -> Result<&'a [u8]> {
    let lfh_offset = usize::try_from(record.local_header_offset)
        .map_err(|_| Error::corrupt("local header offset out of range"))?;
    let lfh = lfh_offset
        .checked_add(LFH_SIZE)
        .and_then(|end| data.get(lfh_offset..end))
        .ok_or_else(|| {
            Error::corrupt(format!(
                "local header of {} at offset {lfh_offset} lies outside the archive",
                record.filename
            ))
        })?;

    // Verify LFH signature (PK\x03\x04)
    if &lfh[0..4] != LFH_SIGNATURE {
        return Err(Error::corrupt(format!(
            "invalid local file header signature for {}",
            record.filename
        )));
    }

    // Variable field lengths sit at fixed positions in the LFH
    let mut cursor = Cursor::new(&lfh[26..]);
    let file_name_length = cursor.read_u16::<LittleEndian>()? as usize;
    let extra_field_length = cursor.read_u16::<LittleEndian>()? as usize;

    // Data starts after: LFH (30 bytes) + filename + extra field
    let data_start = lfh_offset + LFH_SIZE + file_name_length + extra_field_length;
    let data_end = usize::try_from(record.compressed_size)
        .ok()
        .and_then(|len| data_start.checked_add(len))
        .filter(|&end| end <= data.len())
        .ok_or_else(|| {
            Error::corrupt(format!(
                "data of {} is truncated: {} bytes declared, {} available",
                record.filename,
                record.compressed_size,
                data.len().saturating_sub(data_start)
            ))
        })?;

    Ok(&data[data_start..data_end])
}

fn remaining(cursor: &Cursor<&[u8]>) -> usize {
    cursor.get_ref().len().saturating_sub(cursor.position() as usize)
}

/// Borrow the next `len` bytes and advance. Callers check `remaining` first.
fn take<'a>(cursor: &mut Cursor<&'a [u8]>, len: usize) -> &'a [u8] {
    let start = cursor.position() as usize;
    let bytes: &'a [u8] = *cursor.get_ref();
    cursor.set_position((start + len) as u64);
    &bytes[start..start + len]
}
