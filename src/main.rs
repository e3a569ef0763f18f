//! Main entry point for the picoio CLI application.
//!
//! This binary lists, tests, and extracts local ZIP archives. The archive is
//! read into memory in one go and handled by [`picoio::ZipFile`].

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use picoio::{Cli, ZipFile, commands, io};

/// Application entry point.
///
/// Parses command-line arguments, loads the archive, and dispatches to
/// listing, testing, or extraction.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let bytes = io::read_archive_async(&cli.file).await?;
    let archive = ZipFile::from_bytes_with_options(bytes, cli.read_options())
        .with_context(|| format!("cannot open {}", cli.file.display()))?;

    let mut stdout = std::io::stdout();
    if cli.list || cli.verbose {
        commands::list(&archive, cli.verbose, &mut stdout)?;
    } else if cli.test {
        commands::test(&archive, &cli, &mut stdout)?;
    } else {
        commands::extract(&archive, &cli, &mut tokio::io::stdout(), &mut stdout).await?;
    }

    Ok(())
}
