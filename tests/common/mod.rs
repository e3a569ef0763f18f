//! Test-only ZIP writer used to produce fixture archives.

#![allow(dead_code)]

use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::io::Write;
use std::ops::Range;

pub const STORED: u16 = 0;
pub const DEFLATE: u16 = 8;
pub const FLAG_UTF8: u16 = 1 << 11;

// 2024-03-15 13:45:30
pub const DOS_DATE: u16 = ((2024 - 1980) << 9) | (3 << 5) | 15;
pub const DOS_TIME: u16 = (13 << 11) | (45 << 5) | 15;

struct Entry {
    name: Vec<u8>,
    data: Vec<u8>,
    method: u16,
    flags: u16,
    comment: Vec<u8>,
}

/// Byte positions of the structures written by [`ZipBuilder::build_with_layout`].
#[derive(Debug, Default)]
pub struct Layout {
    /// Compressed data segment of each entry
    pub data: Vec<Range<usize>>,
    /// Local file header of each entry
    pub local_headers: Vec<usize>,
    /// Central directory header of each entry
    pub central_headers: Vec<usize>,
    pub eocd: usize,
}

#[derive(Default)]
pub struct ZipBuilder {
    entries: Vec<Entry>,
    comment: Vec<u8>,
    prefix: Vec<u8>,
    zip64: bool,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(self, name: &str, data: &[u8]) -> Self {
        self.raw(name.as_bytes(), data, STORED, 0)
    }

    pub fn deflated(self, name: &str, data: &[u8]) -> Self {
        self.raw(name.as_bytes(), data, DEFLATE, 0)
    }

    pub fn directory(self, name: &str) -> Self {
        self.raw(name.as_bytes(), b"", STORED, 0)
    }

    /// Add an entry with an arbitrary method code. Methods other than
    /// DEFLATE store `data` as-is.
    pub fn raw(mut self, name: &[u8], data: &[u8], method: u16, flags: u16) -> Self {
        self.entries.push(Entry {
            name: name.to_vec(),
            data: data.to_vec(),
            method,
            flags,
            comment: Vec::new(),
        });
        self
    }

    /// Comment on the most recently added entry
    pub fn entry_comment(mut self, comment: &str) -> Self {
        if let Some(entry) = self.entries.last_mut() {
            entry.comment = comment.as_bytes().to_vec();
        }
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = comment.as_bytes().to_vec();
        self
    }

    /// Bytes placed before the archive; recorded offsets ignore them, as in
    /// a self-extracting executable.
    pub fn prefix(mut self, prefix: &[u8]) -> Self {
        self.prefix = prefix.to_vec();
        self
    }

    /// Write ZIP64 records and saturate every 32-bit field they replace.
    pub fn zip64(mut self) -> Self {
        self.zip64 = true;
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.build_with_layout().0
    }

    pub fn build_with_layout(self) -> (Vec<u8>, Layout) {
        let base = self.prefix.len();
        let mut out = self.prefix.clone();
        let mut layout = Layout::default();
        let mut central = Vec::new();

        for entry in &self.entries {
            let crc = crc32fast::hash(&entry.data);
            let payload = if entry.method == DEFLATE {
                deflate(&entry.data)
            } else {
                entry.data.clone()
            };
            let local_offset = (out.len() - base) as u64;
            let uncompressed = entry.data.len() as u64;
            let compressed = payload.len() as u64;

            // Local file header
            layout.local_headers.push(out.len());
            let mut local_extra = Vec::new();
            if self.zip64 {
                local_extra.extend_from_slice(&1u16.to_le_bytes());
                local_extra.extend_from_slice(&16u16.to_le_bytes());
                local_extra.extend_from_slice(&uncompressed.to_le_bytes());
                local_extra.extend_from_slice(&compressed.to_le_bytes());
            }
            out.extend_from_slice(b"PK\x03\x04");
            put16(&mut out, if self.zip64 { 45 } else { 20 });
            put16(&mut out, entry.flags);
            put16(&mut out, entry.method);
            put16(&mut out, DOS_TIME);
            put16(&mut out, DOS_DATE);
            put32(&mut out, crc);
            put32(&mut out, if self.zip64 { u32::MAX } else { compressed as u32 });
            put32(&mut out, if self.zip64 { u32::MAX } else { uncompressed as u32 });
            put16(&mut out, entry.name.len() as u16);
            put16(&mut out, local_extra.len() as u16);
            out.extend_from_slice(&entry.name);
            out.extend_from_slice(&local_extra);

            let start = out.len();
            out.extend_from_slice(&payload);
            layout.data.push(start..out.len());

            // Central directory header, assembled now and appended later
            let mut central_extra = Vec::new();
            if self.zip64 {
                central_extra.extend_from_slice(&1u16.to_le_bytes());
                central_extra.extend_from_slice(&24u16.to_le_bytes());
                central_extra.extend_from_slice(&uncompressed.to_le_bytes());
                central_extra.extend_from_slice(&compressed.to_le_bytes());
                central_extra.extend_from_slice(&local_offset.to_le_bytes());
            }
            let mut header = Vec::new();
            header.extend_from_slice(b"PK\x01\x02");
            put16(&mut header, 0x031E);
            put16(&mut header, if self.zip64 { 45 } else { 20 });
            put16(&mut header, entry.flags);
            put16(&mut header, entry.method);
            put16(&mut header, DOS_TIME);
            put16(&mut header, DOS_DATE);
            put32(&mut header, crc);
            put32(&mut header, if self.zip64 { u32::MAX } else { compressed as u32 });
            put32(&mut header, if self.zip64 { u32::MAX } else { uncompressed as u32 });
            put16(&mut header, entry.name.len() as u16);
            put16(&mut header, central_extra.len() as u16);
            put16(&mut header, entry.comment.len() as u16);
            put16(&mut header, 0);
            put16(&mut header, 0);
            put32(&mut header, 0);
            put32(&mut header, if self.zip64 { u32::MAX } else { local_offset as u32 });
            header.extend_from_slice(&entry.name);
            header.extend_from_slice(&central_extra);
            header.extend_from_slice(&entry.comment);
            central.push(header);
        }

        let cd_offset = (out.len() - base) as u64;
        for header in central {
            layout.central_headers.push(out.len());
            out.extend_from_slice(&header);
        }
        let cd_size = (out.len() - base) as u64 - cd_offset;
        let count = self.entries.len() as u64;

        if self.zip64 {
            let eocd64_offset = (out.len() - base) as u64;
            out.extend_from_slice(b"PK\x06\x06");
            put64(&mut out, 44);
            put16(&mut out, 45);
            put16(&mut out, 45);
            put32(&mut out, 0);
            put32(&mut out, 0);
            put64(&mut out, count);
            put64(&mut out, count);
            put64(&mut out, cd_size);
            put64(&mut out, cd_offset);

            out.extend_from_slice(b"PK\x06\x07");
            put32(&mut out, 0);
            put64(&mut out, eocd64_offset);
            put32(&mut out, 1);
        }

        layout.eocd = out.len();
        out.extend_from_slice(b"PK\x05\x06");
        put16(&mut out, 0);
        put16(&mut out, 0);
        if self.zip64 {
            put16(&mut out, u16::MAX);
            put16(&mut out, u16::MAX);
            put32(&mut out, u32::MAX);
            put32(&mut out, u32::MAX);
        } else {
            put16(&mut out, count as u16);
            put16(&mut out, count as u16);
            put32(&mut out, cd_size as u32);
            put32(&mut out, cd_offset as u32);
        }
        put16(&mut out, self.comment.len() as u16);
        out.extend_from_slice(&self.comment);

        (out, layout)
    }
}

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Overwrite a little-endian u16 at `offset`
pub fn patch16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

/// Overwrite a little-endian u32 at `offset`
pub fn patch32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Deterministic, moderately compressible sample text
pub fn sample_text(len: usize) -> Vec<u8> {
    let words = [
        "archive ", "central ", "directory ", "deflate ", "entry ", "checksum ", "local ",
        "header ", "\n",
    ];
    let mut out = Vec::with_capacity(len);
    let mut i = 0usize;
    while out.len() < len {
        out.extend_from_slice(words[(i * 7 + i / 3) % words.len()].as_bytes());
        i += 1;
    }
    out.truncate(len);
    out
}

fn put16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}
