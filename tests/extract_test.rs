//! Listing and extraction of well-formed archives.

mod common;

use common::{DEFLATE, FLAG_UTF8, STORED, ZipBuilder, sample_text};
use picoio::{ArchiveIndex, CompressionMethod, ZipFile, extract_zip};

#[test]
fn test_hello_and_nested_scenario() {
    for deflate in [false, true] {
        let builder = ZipBuilder::new();
        let bytes = if deflate {
            builder
                .deflated("hello.txt", b"hello world")
                .deflated("nested/other.txt", b"other")
                .build()
        } else {
            builder
                .stored("hello.txt", b"hello world")
                .stored("nested/other.txt", b"other")
                .build()
        };

        let entries = extract_zip(&bytes).unwrap();
        assert_eq!(entries.len(), 2);

        let hello = entries.iter().find(|e| e.filename() == "hello.txt").unwrap();
        assert_eq!(hello.data_as_bytes().unwrap(), b"hello world");
        assert_eq!(hello.record().uncompressed_size, 11);

        let other = entries
            .iter()
            .find(|e| e.filename() == "nested/other.txt")
            .unwrap();
        assert_eq!(other.data_as_bytes().unwrap(), b"other");
    }
}

#[test]
fn test_round_trip_mixed_methods() {
    let files: Vec<(String, Vec<u8>)> = vec![
        ("empty.txt".to_string(), Vec::new()),
        ("one.bin".to_string(), vec![0x5A]),
        ("text/lorem.txt".to_string(), sample_text(10_000)),
        ("zeros.bin".to_string(), vec![0u8; 256 * 1024]),
        (
            "noise.bin".to_string(),
            (0..4096u32).map(|i| (i.wrapping_mul(2654435761) >> 13) as u8).collect(),
        ),
    ];

    let mut builder = ZipBuilder::new();
    for (i, (name, data)) in files.iter().enumerate() {
        builder = if i % 2 == 0 {
            builder.deflated(name, data)
        } else {
            builder.stored(name, data)
        };
    }
    let bytes = builder.build();

    let entries = extract_zip(&bytes).unwrap();
    assert_eq!(entries.len(), files.len());
    for (entry, (name, data)) in entries.iter().zip(&files) {
        assert_eq!(entry.filename(), name);
        assert_eq!(entry.data().unwrap(), data.as_slice());
    }
}

#[test]
fn test_order_matches_central_directory() {
    let names = ["zeta.txt", "alpha.txt", "mid/beta.txt", "Alpha.txt", "0.txt"];
    let mut builder = ZipBuilder::new();
    for name in names {
        builder = builder.deflated(name, name.as_bytes());
    }
    let bytes = builder.build();

    let listed: Vec<String> = extract_zip(&bytes)
        .unwrap()
        .iter()
        .map(|e| e.filename().to_string())
        .collect();
    assert_eq!(listed, names);

    let archive = ZipFile::from_bytes(bytes).unwrap();
    let recorded: Vec<&str> = archive
        .entries()
        .unwrap()
        .iter()
        .map(|r| r.filename.as_str())
        .collect();
    assert_eq!(recorded, names);
}

#[test]
fn test_duplicate_names_are_distinct_entries() {
    let bytes = ZipBuilder::new()
        .stored("dup.txt", b"first")
        .stored("other.txt", b"between")
        .deflated("dup.txt", b"second")
        .build();

    let entries = extract_zip(&bytes).unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].data().unwrap(), b"first");
    assert_eq!(entries[2].data().unwrap(), b"second");

    let archive = ZipFile::from_bytes(bytes).unwrap();
    assert_eq!(archive.by_name("dup.txt").unwrap().data().unwrap(), b"first");
    assert_eq!(archive.by_index(2).unwrap().data().unwrap(), b"second");
}

#[test]
fn test_empty_archive() {
    let bytes = ZipBuilder::new().build();
    assert_eq!(bytes.len(), 22);
    assert!(extract_zip(&bytes).unwrap().is_empty());

    let archive = ZipFile::from_bytes(bytes).unwrap();
    assert!(archive.is_empty().unwrap());
    assert_eq!(archive.extract_all().unwrap().len(), 0);
}

#[test]
fn test_records_carry_metadata() {
    let text = sample_text(2048);
    let bytes = ZipBuilder::new()
        .deflated("doc.txt", &text)
        .entry_comment("the document")
        .stored("raw.bin", b"raw")
        .build();

    let index = ArchiveIndex::parse(&bytes).unwrap();
    let doc = &index.records()[0];
    assert_eq!(doc.compression_method, CompressionMethod::Deflate);
    assert_eq!(doc.uncompressed_size, text.len() as u64);
    assert!(doc.compressed_size < doc.uncompressed_size);
    assert_eq!(doc.crc32, crc32fast::hash(&text));
    assert_eq!(doc.local_header_offset, 0);
    assert_eq!(doc.comment, "the document");
    assert_eq!(doc.mod_date(), (2024, 3, 15));
    assert_eq!(doc.mod_time(), (13, 45, 30));

    let raw = &index.records()[1];
    assert_eq!(raw.compression_method, CompressionMethod::Stored);
    assert_eq!(raw.compressed_size, 3);
    assert!(raw.local_header_offset > 0);
}

#[test]
fn test_directories_are_listed_but_not_files() {
    let bytes = ZipBuilder::new()
        .directory("nested/")
        .stored("nested/other.txt", b"other")
        .build();

    let entries = extract_zip(&bytes).unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].is_dir());
    assert_eq!(entries[0].data().unwrap(), b"");

    let archive = ZipFile::from_bytes(bytes).unwrap();
    let files: Vec<String> = archive
        .files()
        .unwrap()
        .map(|e| e.filename().to_string())
        .collect();
    assert_eq!(files, ["nested/other.txt"]);
}

#[test]
fn test_filename_encodings() {
    let utf8_name = "r\u{e9}sum\u{e9}.txt";
    let bytes = ZipBuilder::new()
        .raw(utf8_name.as_bytes(), b"utf8", STORED, FLAG_UTF8)
        .raw(&[0x82, b'.', b't', b'x', b't'], b"cp437", STORED, 0)
        .raw(b"dir\\file.txt", b"backslash", DEFLATE, 0)
        .build();

    let entries = extract_zip(&bytes).unwrap();
    assert_eq!(entries[0].filename(), utf8_name);
    assert!(entries[0].record().is_utf8());
    assert_eq!(entries[1].filename(), "\u{e9}.txt");
    assert_eq!(entries[2].filename(), "dir/file.txt");
    assert_eq!(entries[2].data().unwrap(), b"backslash");
}

#[test]
fn test_archive_comment() {
    let bytes = ZipBuilder::new()
        .stored("a.txt", b"a")
        .comment("built for tests")
        .build();

    let archive = ZipFile::from_bytes(bytes).unwrap();
    assert_eq!(archive.comment().unwrap(), "built for tests");
    assert_eq!(archive.by_name("a.txt").unwrap().data().unwrap(), b"a");
}

#[test]
fn test_prepended_data_is_skipped() {
    let stub = vec![0x7Fu8; 1000];
    let bytes = ZipBuilder::new()
        .prefix(&stub)
        .deflated("hello.txt", b"hello world")
        .stored("nested/other.txt", b"other")
        .build();

    let index = ArchiveIndex::parse(&bytes).unwrap();
    assert_eq!(index.base_offset(), 1000);
    assert_eq!(index.records()[0].local_header_offset, 1000);

    let entries = extract_zip(&bytes).unwrap();
    assert_eq!(entries[0].data().unwrap(), b"hello world");
    assert_eq!(entries[1].data().unwrap(), b"other");
}

#[test]
fn test_zip64_records() {
    let text = sample_text(5000);
    let bytes = ZipBuilder::new()
        .zip64()
        .deflated("big.txt", &text)
        .stored("small.txt", b"small")
        .build();

    let index = ArchiveIndex::parse(&bytes).unwrap();
    assert_eq!(index.len(), 2);
    assert_eq!(index.records()[0].uncompressed_size, text.len() as u64);
    assert_eq!(index.records()[1].compressed_size, 5);

    let entries = extract_zip(&bytes).unwrap();
    assert_eq!(entries[0].data().unwrap(), text.as_slice());
    assert_eq!(entries[1].data().unwrap(), b"small");
}

#[test]
fn test_data_is_cached_per_view() {
    let bytes = ZipBuilder::new()
        .deflated("a.txt", &sample_text(4096))
        .build();
    let archive = ZipFile::from_bytes(bytes).unwrap();

    let view = archive.by_name("a.txt").unwrap();
    assert!(!view.is_cached());
    let first = view.data().unwrap();
    assert!(view.is_cached());
    let second = view.data().unwrap();
    assert_eq!(first.as_ptr(), second.as_ptr());
    assert_eq!(first, second);

    // A fresh view starts empty but yields the same bytes
    let other = archive.by_name("a.txt").unwrap();
    assert!(!other.is_cached());
    assert_eq!(other.data().unwrap(), first);
    assert_eq!(other.into_data().unwrap(), first);
}

#[test]
fn test_exactly_65535_entries_without_zip64() {
    // A full 16-bit entry count is a legal plain value when no ZIP64 locator follows
    let mut builder = ZipBuilder::new();
    for i in 0..u16::MAX {
        builder = builder.stored(&format!("{i:05}"), b"");
    }
    let (bytes, layout) = builder.build_with_layout();
    assert_eq!(&bytes[layout.eocd + 10..layout.eocd + 12], &[0xFF, 0xFF]);

    let index = ArchiveIndex::parse(&bytes).unwrap();
    assert_eq!(index.len(), 65_535);
    assert_eq!(index.records()[0].filename, "00000");
    assert_eq!(index.records()[65_534].filename, "65534");

    let archive = ZipFile::from_bytes(bytes).unwrap();
    assert_eq!(archive.by_name("65534").unwrap().data().unwrap(), b"");
}
