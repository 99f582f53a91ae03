use std::io::{self, BufRead, Write};

use organizer::genres::{consolidate, score};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Reads one track per line as comma-separated genre tags and prints the
/// parent genre of each tag followed by the track's winning genre.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (line_no, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        let tags: Vec<&str> = line
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .collect();
        debug!(line = line_no + 1, tags = tags.len(), "classifying");
        for tag in &tags {
            writeln!(out, "  {:<32} -> {}", tag, consolidate(tag))?;
        }
        writeln!(out, "track {}: {}", line_no + 1, score(&tags))?;
    }
    Ok(())
}
