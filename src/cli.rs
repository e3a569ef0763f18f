use clap::Parser;
use std::path::{Component, Path, PathBuf};

use crate::zip::{EntryRecord, ReadOptions};

#[derive(Parser, Debug)]
#[command(name = "picoio")]
#[command(version)]
#[command(about = "List, test and extract ZIP archives held in memory", long_about = None)]
#[command(after_help = "Examples:\n  \
  picoio data1.zip -x joe        extract all files except joe from data1.zip\n  \
  picoio -p foo.zip | more       send contents of foo.zip via pipe into more\n  \
  picoio -t archive.zip          check every entry's CRC32")]
pub struct Cli {
    /// ZIP file path
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Files to extract (default: all)
    #[arg(value_name = "FILES")]
    pub files: Vec<String>,

    /// List files (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely/show version info
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Test archive files
    #[arg(short = 't')]
    pub test: bool,

    /// Extract files to pipe, no messages
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Extract files into exdir
    #[arg(short = 'd', value_name = "DIR")]
    pub extract_dir: Option<PathBuf>,

    /// Exclude files that follow
    #[arg(short = 'x', value_name = "FILE", num_args = 1..)]
    pub exclude: Vec<String>,

    /// Never overwrite existing files
    #[arg(short = 'n')]
    pub never_overwrite: bool,

    /// Overwrite files WITHOUT prompting
    #[arg(short = 'o')]
    pub overwrite: bool,

    /// Junk paths (do not make directories)
    #[arg(short = 'j')]
    pub junk_paths: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,

    /// Refuse entries larger than this many bytes when uncompressed
    #[arg(long, value_name = "BYTES")]
    pub max_entry_size: Option<u64>,
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    pub fn read_options(&self) -> ReadOptions {
        match self.max_entry_size {
            Some(limit) => ReadOptions::new().max_entry_size(limit),
            None => ReadOptions::new(),
        }
    }

    /// The entry filter built from the positional names and `-x` exclusions.
    pub fn selection(&self) -> Selection {
        Selection {
            include: self.files.iter().map(|f| Pattern::new(f)).collect(),
            exclude: self.exclude.iter().map(|x| Pattern::new(x)).collect(),
        }
    }

    /// Where `entry` should be written, or `None` if its name would escape
    /// the destination directory.
    pub fn output_path(&self, entry: &EntryRecord) -> Option<PathBuf> {
        let relative = if self.junk_paths {
            sanitize_entry_path(basename(&entry.filename))?
        } else {
            sanitize_entry_path(&entry.filename)?
        };
        if relative.as_os_str().is_empty() {
            return None;
        }

        Some(match &self.extract_dir {
            Some(dir) => dir.join(relative),
            None => relative,
        })
    }
}

fn basename(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Turn an archive path into a relative filesystem path.
///
/// Rejects absolute paths, drive prefixes and `..` components.
pub fn sanitize_entry_path(name: &str) -> Option<PathBuf> {
    let mut path = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(path)
}

/// Which file records an extraction or test run touches.
///
/// Directories are never selected; they are created on demand.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl Selection {
    pub fn selects(&self, record: &EntryRecord) -> bool {
        if record.is_dir {
            return false;
        }
        let name = record.filename.as_str();
        (self.include.is_empty() || self.include.iter().any(|p| p.matches(name)))
            && !self.exclude.iter().any(|p| p.matches(name))
    }

    /// Whether any positional names were given.
    pub fn is_restricted(&self) -> bool {
        !self.include.is_empty()
    }
}

/// One name given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// A plain name: the full path, its basename, or a directory prefix.
    Name(String),
    /// A wildcard pattern over the full path.
    Glob(Vec<char>),
}

impl Pattern {
    pub fn new(text: &str) -> Self {
        if text.contains(['*', '?']) {
            Pattern::Glob(text.chars().collect())
        } else {
            Pattern::Name(text.to_string())
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            Pattern::Name(plain) => {
                let dir = plain.trim_end_matches('/');
                name == plain
                    || basename(name) == plain
                    || name.strip_prefix(dir).is_some_and(|rest| rest.starts_with('/'))
            }
            Pattern::Glob(pattern) => wildcard_match(pattern, name),
        }
    }
}

/// Match `text` against `*` / `?` wildcards.
///
/// Walks both sides once. On a mismatch the last `*` absorbs one more
/// character and matching resumes after it.
fn wildcard_match(pattern: &[char], text: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0, 0);
    // Index of the last `*` and the text position it has absorbed up to
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((star_p, star_t)) => {
                    star = Some((star_p, star_t + 1));
                    p = star_p + 1;
                    t = star_t + 1;
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}
