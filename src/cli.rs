//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Fetch and normalize BibTeX records by DOI.
///
/// bibfetch looks up records on Crossref and rewrites their citation keys to
/// `{journal acronym}_{volume}_{year}_{surname}`, abbreviating journal names
/// and cleaning titles along the way.
#[derive(Parser, Debug)]
#[command(name = "bibfetch")]
#[command(author, version, about)]
pub struct Args {
    /// Fetch the BibTeX record of a DOI
    #[arg(long = "bib", value_name = "DOI")]
    pub bib: Option<String>,

    /// Fetch BibTeX records for every reference of a DOI
    #[arg(long = "ref", value_name = "DOI")]
    pub reference: Option<String>,

    /// Fetch BibTeX records for PDF files
    #[arg(long = "pdf", value_name = "PDF", num_args = 1..)]
    pub pdf: Vec<PathBuf>,

    /// Rename PDF files after their citation keys
    #[arg(long = "ren", value_name = "PDF", num_args = 1..)]
    pub ren: Vec<PathBuf>,

    /// List duplicate entries in BibTeX files
    #[arg(long = "dup", value_name = "BIB", num_args = 1..)]
    pub dup: Vec<PathBuf>,

    /// Write BibTeX output to a file instead of stdout
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Bypass the on-disk response cache
    #[arg(long)]
    pub no_cache: bool,

    /// Contact email sent to Crossref for polite-pool access
    #[arg(long, value_name = "EMAIL")]
    pub mailto: Option<String>,

    /// Disable colored log output
    #[arg(long)]
    pub no_color: bool,
}

impl Args {
    /// Whether any of `--bib`, `--ref`, `--pdf`, `--ren`, `--dup` was given.
    #[must_use]
    pub fn has_command(&self) -> bool {
        self.bib.is_some()
            || self.reference.is_some()
            || !self.pdf.is_empty()
            || !self.ren.is_empty()
            || !self.dup.is_empty()
    }
}
