//! Whole-file access for archives opened by path.

mod local;

pub use local::{read_archive, read_archive_async};
