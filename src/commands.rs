//! The list, test and extract actions behind the `picoio` binary.
//!
//! Each action takes the open archive, the parsed [`Cli`] and the writers its
//! output goes to, so `main` only wires them to stdout.

use anyhow::{Context, Result, bail};
use std::io::Write;
use std::path::Path;
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::cli::Cli;
use crate::zip::{EntryRecord, EntryView, ZipFile};

/// Sizes and file count over the non-directory records of an archive.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ListingTotals {
    pub uncompressed: u64,
    pub compressed: u64,
    pub files: usize,
}

impl ListingTotals {
    /// Sum `records`, saturating at `u64::MAX` for hostile size fields.
    pub fn from_records(records: &[EntryRecord]) -> Self {
        records
            .iter()
            .filter(|record| !record.is_dir)
            .fold(Self::default(), |totals, record| Self {
                uncompressed: totals.uncompressed.saturating_add(record.uncompressed_size),
                compressed: totals.compressed.saturating_add(record.compressed_size),
                files: totals.files + 1,
            })
    }
}

/// Percentage of `uncompressed` saved by compression. Zero for empty input,
/// negative when the stored form is larger.
pub fn savings(compressed: u64, uncompressed: u64) -> i64 {
    let Some(kept) = compressed.saturating_mul(100).checked_div(uncompressed) else {
        return 0;
    };
    100 - i64::try_from(kept).unwrap_or(i64::MAX - 100)
}

/// Print the archive listing: names only, or a table when `verbose`.
pub fn list(archive: &ZipFile, verbose: bool, out: &mut impl Write) -> Result<ListingTotals> {
    let records = archive.entries()?;
    let totals = ListingTotals::from_records(records);

    if !verbose {
        for record in records {
            writeln!(out, "{}", record.filename)?;
        }
        return Ok(totals);
    }

    let rule = "-".repeat(70);
    writeln!(
        out,
        "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
        "Length", "Size", "Cmpr", "Date", "Time"
    )?;
    writeln!(out, "{rule}")?;

    for record in records {
        let (year, month, day) = record.mod_date();
        let (hour, minute, _) = record.mod_time();
        writeln!(
            out,
            "{:>10}  {:>10}  {:>4}%  {year:04}-{month:02}-{day:02}  {hour:02}:{minute:02}  {}",
            record.uncompressed_size,
            record.compressed_size,
            savings(record.compressed_size, record.uncompressed_size),
            record.filename
        )?;
    }

    writeln!(out, "{rule}")?;
    writeln!(
        out,
        "{:>10}  {:>10}  {:>4}%  {:>17}  {} files",
        totals.uncompressed,
        totals.compressed,
        savings(totals.compressed, totals.uncompressed),
        "",
        totals.files
    )?;

    let comment = archive.comment()?;
    if !comment.is_empty() {
        writeln!(out, "{comment}")?;
    }

    Ok(totals)
}

/// Decompress every selected file and check its CRC32, like `unzip -t`.
///
/// Returns the number of files checked. Fails if any of them is damaged,
/// after every file has been tried.
pub fn test(archive: &ZipFile, cli: &Cli, out: &mut impl Write) -> Result<usize> {
    let selection = cli.selection();
    let mut checked = 0usize;
    let mut failed = 0usize;

    for entry in archive.files()?.filter(|e| selection.selects(e.record())) {
        checked += 1;
        match entry.verify() {
            Ok(()) if !cli.is_quiet() => {
                writeln!(out, "    testing: {:<40} OK", entry.filename())?;
            }
            Ok(()) => {}
            Err(e) => {
                failed += 1;
                if !cli.is_very_quiet() {
                    writeln!(out, "    testing: {:<40} {e}", entry.filename())?;
                }
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {checked} files failed in {}", cli.file.display());
    }
    if !cli.is_very_quiet() {
        writeln!(out, "No errors detected in {}", cli.file.display())?;
    }
    Ok(checked)
}

/// What happened to one selected file during extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Written below the destination directory.
    Written,
    /// Sent to the pipe writer (`-p`).
    Piped,
    /// Left alone because the target exists (`-n`, or no `-o`).
    Exists,
    /// Refused because the name would escape the destination.
    UnsafePath,
}

/// Extract every selected file, or stream it to `pipe` with `-p`.
///
/// Progress and skip notices go to `report`. Returns each selected name with
/// its [`Outcome`], in archive order.
pub async fn extract<W>(
    archive: &ZipFile,
    cli: &Cli,
    pipe: &mut W,
    report: &mut impl Write,
) -> Result<Vec<(String, Outcome)>>
where
    W: AsyncWrite + Unpin,
{
    let selection = cli.selection();
    let selected: Vec<EntryView<'_>> = archive
        .files()?
        .filter(|entry| selection.selects(entry.record()))
        .collect();

    if selected.is_empty() && selection.is_restricted() {
        bail!("no matching entries in {}", cli.file.display());
    }

    let banners = cli.pipe && selected.len() > 1;
    let mut outcomes = Vec::with_capacity(selected.len());
    for entry in &selected {
        let outcome = if cli.pipe {
            pipe_entry(entry, banners, pipe).await?
        } else {
            write_entry(entry, cli, report).await?
        };
        debug!(name = entry.filename(), ?outcome, "entry handled");
        outcomes.push((entry.filename().to_string(), outcome));
    }

    Ok(outcomes)
}

async fn pipe_entry<W>(entry: &EntryView<'_>, banner: bool, pipe: &mut W) -> Result<Outcome>
where
    W: AsyncWrite + Unpin,
{
    if banner {
        pipe.write_all(format!("--- {} ---\n", entry.filename()).as_bytes())
            .await?;
    }
    pipe.write_all(entry.data()?).await?;
    pipe.flush().await?;
    Ok(Outcome::Piped)
}

async fn write_entry(
    entry: &EntryView<'_>,
    cli: &Cli,
    report: &mut impl Write,
) -> Result<Outcome> {
    let Some(target) = cli.output_path(entry.record()) else {
        if !cli.is_very_quiet() {
            writeln!(report, "Skipping: {} (unsafe path)", entry.filename())?;
        }
        return Ok(Outcome::UnsafePath);
    };

    let keep_existing = cli.never_overwrite || !cli.overwrite;
    if keep_existing && fs::try_exists(&target).await.unwrap_or(false) {
        if !cli.is_quiet() {
            let reason = if cli.never_overwrite {
                "file exists"
            } else {
                "use -o to overwrite"
            };
            writeln!(report, "Skipping: {} ({reason})", entry.filename())?;
        }
        return Ok(Outcome::Exists);
    }

    if !cli.is_quiet() {
        writeln!(report, "  extracting: {}", entry.filename())?;
    }

    let data = entry
        .data()
        .with_context(|| format!("cannot extract {}", entry.filename()))?;
    write_file(&target, data)
        .await
        .with_context(|| format!("cannot write {}", target.display()))?;

    Ok(Outcome::Written)
}

async fn write_file(target: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = target.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).await?;
    }
    let mut file = fs::File::create(target).await?;
    file.write_all(data).await?;
    file.flush().await?;
    Ok(())
}
