//! Command execution for the bibfetch binary.
//!
//! Commands run in a fixed order (bib, ref, pdf, ren, dup); the first error
//! stops the run.

pub(crate) mod config;
pub(crate) mod output;
pub(crate) mod terminal;

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use bibfetch_core::pdf::default_extractor;
use bibfetch_core::resolver::build_http_client;
use bibfetch_core::{
    AbbrevisoClient, CrossrefClient, HttpFetcher, LocatedEntry, Pipeline, ResponseCache,
    TracingSink, confirm_and_rename, find_duplicates, parse_bibliography, parse_doi,
    resolve_default_cache_path,
};
use tracing::{debug, info, warn};

use crate::cli::Args;
use config::RunSettings;

/// Runs every command given in `args`.
pub(crate) async fn run(args: &Args, settings: &RunSettings) -> Result<()> {
    let cache = open_cache(settings).await;
    let client = build_http_client(settings.http)?;
    let http = Arc::new(HttpFetcher::new(client, cache));
    let crossref = CrossrefClient::new(Arc::clone(&http), settings.mailto.clone())?;
    let abbreviso = AbbrevisoClient::new(http);
    let pipeline = Pipeline::new(&crossref, &abbreviso)
        .with_progress(terminal::progress_enabled(settings.quiet));
    let mut sink = TracingSink::new();

    if let Some(raw) = &args.bib {
        let doi = parse_doi(raw)?;
        let bibtex = pipeline.bibtex_for_doi(&doi, &mut sink).await?;
        output::write_bibtex(&bibtex, args.output.as_deref())?;
    }

    if let Some(raw) = &args.reference {
        let doi = parse_doi(raw)?;
        let report = pipeline.bibtex_for_references(&doi, &mut sink).await?;
        for line in output::missing_doi_lines(&report.without_doi) {
            eprintln!("{line}");
        }
        if !report.failed.is_empty() {
            warn!(count = report.failed.len(), "Some referenced records could not be fetched");
        }
        output::write_bibtex(&report.bibtex, args.output.as_deref())?;
    }

    if !args.pdf.is_empty() {
        let extractor = default_extractor()?;
        let report = pipeline
            .bibtex_for_pdfs(extractor.as_ref(), &args.pdf, &mut sink)
            .await?;
        for file in &report.unresolved {
            warn!(file = %file.display(), "No BibTeX record found for PDF");
        }
        output::write_bibtex(&report.bibtex, args.output.as_deref())?;
    }

    if !args.ren.is_empty() {
        let extractor = default_extractor()?;
        let report = pipeline
            .plan_renames(extractor.as_ref(), &args.ren, &mut sink)
            .await?;
        if !report.without_info.is_empty() {
            eprintln!(
                "Unable to find information for {} files.",
                report.without_info.len()
            );
        }
        let summary = confirm_and_rename(&report.plans, io::stdin().lock(), io::stderr())
            .context("Failed to rename PDF files")?;
        info!(
            renamed = summary.renamed,
            declined = summary.declined,
            skipped = summary.skipped,
            "Rename finished"
        );
    }

    if !args.dup.is_empty() {
        list_duplicates(&args.dup)?;
    }

    debug!(diagnostics = sink.reported(), "Run complete");
    Ok(())
}

async fn open_cache(settings: &RunSettings) -> Option<ResponseCache> {
    if !settings.use_cache {
        debug!("Response cache disabled");
        return None;
    }
    let Some(path) = resolve_default_cache_path() else {
        warn!("No cache directory available (HOME unset); continuing without cache");
        return None;
    };
    match ResponseCache::open(&path, settings.cache_expiry).await {
        Ok(cache) => {
            match cache.purge_expired().await {
                Ok(purged) => debug!(purged, "Purged expired cache entries"),
                Err(error) => warn!(error = %error, "Failed to purge expired cache entries"),
            }
            Some(cache)
        }
        Err(error) => {
            warn!(path = %path.display(), error = %error, "Response cache unavailable; continuing without cache");
            None
        }
    }
}

fn list_duplicates(files: &[PathBuf]) -> Result<()> {
    let mut entries = Vec::new();
    for file in files {
        let raw = fs::read_to_string(file)
            .with_context(|| format!("Failed to read BibTeX file '{}'", file.display()))?;
        let parsed = parse_bibliography(&raw);
        for skipped in &parsed.skipped {
            warn!(file = %file.display(), skipped = %skipped, "Skipped malformed entry");
        }
        let source = file.display().to_string();
        entries.extend(parsed.bibliography.entries.into_iter().map(|entry| LocatedEntry {
            source: source.clone(),
            entry,
        }));
    }

    let groups = find_duplicates(&entries);
    for line in output::duplicate_report_lines(&groups, &entries) {
        println!("{line}");
    }
    Ok(())
}
