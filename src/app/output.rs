//! Writing BibTeX results and user-facing reports.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use bibfetch_core::{DuplicateGroup, LocatedEntry};
use tracing::info;

/// First line of every output file.
pub(crate) const OUTPUT_HEADER: &str = "%comment{This file was created by bibfetch}";

/// File contents for `bibtex`: header, two blank lines, then the records.
pub(crate) fn render_output_file(bibtex: &str) -> String {
    format!("{OUTPUT_HEADER}\n\n\n{bibtex}")
}

/// Writes `bibtex` to `output`, or prints it to stdout when no file is given.
pub(crate) fn write_bibtex(bibtex: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, render_output_file(bibtex))
                .with_context(|| format!("Failed to write output file '{}'", path.display()))?;
            info!(path = %path.display(), "Wrote BibTeX output");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{bibtex}").context("Failed to write to stdout")?;
        }
    }
    Ok(())
}

/// Lines listing references that carry no DOI.
pub(crate) fn missing_doi_lines(references: &[String]) -> Vec<String> {
    if references.is_empty() {
        return Vec::new();
    }
    let mut lines = Vec::with_capacity(references.len() + 1);
    lines.push(format!(
        "DOIs not found for following {} references:",
        references.len()
    ));
    lines.extend(references.iter().map(|reference| format!("  {reference}")));
    lines
}

/// Lines describing every duplicate group, or a single all-clear line.
pub(crate) fn duplicate_report_lines(groups: &[DuplicateGroup], entries: &[LocatedEntry]) -> Vec<String> {
    if groups.is_empty() {
        return vec![format!("No duplicates found among {} entries.", entries.len())];
    }
    groups.iter().map(|group| group.describe(entries)).collect()
}
