/// Limits applied while parsing an archive and materializing entries.
///
/// The default imposes no limits.
///
/// ```
/// use picoio::ReadOptions;
///
/// let options = ReadOptions::new()
///     .max_entry_size(64 * 1024 * 1024)
///     .max_entries(10_000);
/// assert_eq!(options.entry_size_limit(), Some(64 * 1024 * 1024));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    max_entry_size: Option<u64>,
    max_entries: Option<u64>,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject entries whose declared uncompressed size exceeds `bytes`.
    pub fn max_entry_size(mut self, bytes: u64) -> Self {
        self.max_entry_size = Some(bytes);
        self
    }

    /// Reject archives whose directory declares more than `count` entries.
    pub fn max_entries(mut self, count: u64) -> Self {
        self.max_entries = Some(count);
        self
    }

    pub fn entry_size_limit(&self) -> Option<u64> {
        self.max_entry_size
    }

    pub fn entry_count_limit(&self) -> Option<u64> {
        self.max_entries
    }
}
