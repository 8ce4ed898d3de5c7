//! End-to-end flows: DOI, reference list, or PDFs in; normalized BibTeX out.
//!
//! The [`Pipeline`] owns no network state of its own. It drives a
//! [`BibliographySource`] and an [`AbbreviationService`] one request at a
//! time, prefetches the abbreviations a batch needs, and hands the batch to the
//! synchronous [`Normalizer`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::bibtex::{Bibliography, parse_bibliography, write_bibliography};
use crate::normalize::{AbbreviationTable, DiagnosticSink, Normalizer};
use crate::pdf::{PdfDoiExtractor, PdfError, check_pdf_inputs};
use crate::rename::RenamePlan;
use crate::resolver::{AbbreviationService, BibliographySource, FetchError, Lookup};

/// Errors that end a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The record for a single DOI could not be obtained
    #[error("Unable to parse bibtex information.\n  Why: {reason} (doi: {doi})\n  Suggestion: check the DOI and try again")]
    BibtexUnavailable { doi: String, reason: String },

    /// The reference list of a work could not be obtained
    #[error("Unable to parse reference list.\n  Why: {reason} (doi: {doi})\n  Suggestion: Crossref only lists references deposited by the publisher")]
    ReferenceListUnavailable { doi: String, reason: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Pdf(#[from] PdfError),
}

/// Output of [`Pipeline::bibtex_for_references`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceReport {
    pub bibtex: String,
    /// Display text of references that carry no DOI.
    pub without_doi: Vec<String>,
    /// DOIs whose records could not be fetched.
    pub failed: Vec<String>,
}

/// Output of [`Pipeline::bibtex_for_pdfs`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfReport {
    pub bibtex: String,
    /// Files for which no record was found.
    pub unresolved: Vec<PathBuf>,
}

/// Output of [`Pipeline::plan_renames`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameReport {
    pub plans: Vec<RenamePlan>,
    /// Files for which no record was found.
    pub without_info: Vec<PathBuf>,
}

/// Sequential fetch-and-normalize flows.
pub struct Pipeline<'a> {
    source: &'a dyn BibliographySource,
    abbreviations: &'a dyn AbbreviationService,
    show_progress: bool,
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub fn new(
        source: &'a dyn BibliographySource,
        abbreviations: &'a dyn AbbreviationService,
    ) -> Self {
        Self {
            source,
            abbreviations,
            show_progress: false,
        }
    }

    /// Draws progress bars on stderr for multi-record fetches.
    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Looks up the abbreviation of every distinct journal in `bibliography`.
    pub async fn prefetch_abbreviations(&self, bibliography: &Bibliography) -> AbbreviationTable {
        let mut table = AbbreviationTable::new();
        for journal in bibliography.entries.iter().filter_map(|e| e.get("journal")) {
            if table.contains(journal) {
                continue;
            }
            let abbreviation = self.abbreviations.abbreviate(journal).await;
            table.insert(journal, abbreviation);
        }
        debug!(journals = table.len(), "Prefetched journal abbreviations");
        table
    }

    /// Prefetches abbreviations, then normalizes the batch.
    pub async fn normalize_batch(
        &self,
        bibliography: Bibliography,
        sink: &mut dyn DiagnosticSink,
    ) -> Bibliography {
        let table = self.prefetch_abbreviations(&bibliography).await;
        Normalizer::new(&table).normalize(bibliography, sink)
    }

    /// Fetches and normalizes the record of one DOI.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::BibtexUnavailable`] when the DOI is unknown or
    /// the response holds no entry, and [`PipelineError::Fetch`] on transport
    /// failure.
    #[instrument(skip(self, sink), fields(source = self.source.name()))]
    pub async fn bibtex_for_doi(
        &self,
        doi: &str,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<String, PipelineError> {
        let bibtex = match self.source.fetch_bibtex(doi).await? {
            Lookup::Found(bibtex) => bibtex,
            Lookup::Missing { reason } => {
                return Err(PipelineError::BibtexUnavailable {
                    doi: doi.to_string(),
                    reason,
                });
            }
        };

        let parsed = parse_bibliography(&bibtex);
        if parsed.bibliography.is_empty() {
            return Err(PipelineError::BibtexUnavailable {
                doi: doi.to_string(),
                reason: "response contained no BibTeX entry".to_string(),
            });
        }
        report_skipped(&parsed.skipped, sink);

        let normalized = self.normalize_batch(parsed.bibliography, sink).await;
        Ok(write_bibliography(&normalized))
    }

    /// Fetches every DOI-bearing reference of a work and normalizes them as
    /// one batch. References whose record cannot be fetched are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ReferenceListUnavailable`] when the list
    /// itself cannot be obtained.
    #[instrument(skip(self, sink), fields(source = self.source.name()))]
    pub async fn bibtex_for_references(
        &self,
        doi: &str,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<ReferenceReport, PipelineError> {
        let unavailable = |reason: String| PipelineError::ReferenceListUnavailable {
            doi: doi.to_string(),
            reason,
        };
        let references = match self.source.fetch_reference_list(doi).await {
            Ok(Lookup::Found(references)) => references,
            Ok(Lookup::Missing { reason }) => return Err(unavailable(reason)),
            Err(error) => return Err(unavailable(error.to_string())),
        };

        let mut report = ReferenceReport::default();
        let mut dois = Vec::new();
        for reference in references {
            match reference.doi.as_deref().map(str::trim) {
                Some(reference_doi) if !reference_doi.is_empty() => {
                    dois.push(reference_doi.to_string());
                }
                _ => report.without_doi.push(reference.to_string()),
            }
        }
        info!(
            with_doi = dois.len(),
            without_doi = report.without_doi.len(),
            "Fetched reference list"
        );

        let progress = self.progress_bar(dois.len(), "Getting references");
        let mut found = Vec::with_capacity(dois.len());
        for reference_doi in dois {
            match self.fetch_record(&reference_doi).await {
                Some(bibtex) => found.push(bibtex),
                None => report.failed.push(reference_doi),
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        report.bibtex = self.normalize_text(&found.join("\n\n"), sink).await;
        Ok(report)
    }

    /// Resolves each PDF to a DOI, fetches the records, and normalizes them as
    /// one batch. Files without a DOI or record are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Pdf`] when an input is not an existing `.pdf`
    /// file; no file is read or fetched in that case.
    #[instrument(skip_all, fields(files = pdfs.len()))]
    pub async fn bibtex_for_pdfs(
        &self,
        extractor: &dyn PdfDoiExtractor,
        pdfs: &[PathBuf],
        sink: &mut dyn DiagnosticSink,
    ) -> Result<PdfReport, PipelineError> {
        check_pdf_inputs(pdfs)?;

        let mut report = PdfReport::default();
        let progress = self.progress_bar(pdfs.len(), "Parsing files for bibtex");
        let mut found = Vec::with_capacity(pdfs.len());
        for pdf in pdfs {
            match self.record_for_pdf(extractor, pdf).await {
                Some(bibtex) => found.push(bibtex),
                None => report.unresolved.push(pdf.clone()),
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        report.bibtex = self.normalize_text(&found.join("\n\n"), sink).await;
        Ok(report)
    }

    /// Proposes a `<key>.pdf` name for each PDF whose record can be found.
    /// Each record is normalized on its own; when two files would get the same
    /// name, the later one gets a `_1`, `_2`, ... suffix.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Pdf`] when an input is not an existing `.pdf`
    /// file.
    #[instrument(skip_all, fields(files = pdfs.len()))]
    pub async fn plan_renames(
        &self,
        extractor: &dyn PdfDoiExtractor,
        pdfs: &[PathBuf],
        sink: &mut dyn DiagnosticSink,
    ) -> Result<RenameReport, PipelineError> {
        check_pdf_inputs(pdfs)?;

        let mut report = RenameReport::default();
        let mut targets: HashSet<PathBuf> = HashSet::with_capacity(pdfs.len());
        let progress = self.progress_bar(pdfs.len(), "Parsing files for info");
        for pdf in pdfs {
            let key = match self.record_for_pdf(extractor, pdf).await {
                Some(bibtex) => self.key_for_record(&bibtex, sink).await,
                None => None,
            };
            match key {
                Some(key) => report.plans.push(unique_plan(pdf, &key, &mut targets)),
                None => report.without_info.push(pdf.clone()),
            }
            progress.inc(1);
        }
        progress.finish_and_clear();
        Ok(report)
    }

    async fn key_for_record(&self, bibtex: &str, sink: &mut dyn DiagnosticSink) -> Option<String> {
        let parsed = parse_bibliography(bibtex);
        report_skipped(&parsed.skipped, sink);
        let first = parsed.bibliography.entries.into_iter().next()?;
        let normalized = self
            .normalize_batch(Bibliography::new(vec![first]), sink)
            .await;
        normalized.entries.into_iter().next().map(|entry| entry.key)
    }

    async fn record_for_pdf(&self, extractor: &dyn PdfDoiExtractor, pdf: &Path) -> Option<String> {
        let doi = match extractor.extract_doi(pdf) {
            Ok(Some(doi)) => doi,
            Ok(None) => {
                warn!(file = %pdf.display(), "No DOI found in PDF");
                return None;
            }
            Err(error) => {
                warn!(file = %pdf.display(), error = %error, "Could not read PDF");
                return None;
            }
        };
        debug!(file = %pdf.display(), %doi, "Resolved PDF to DOI");
        self.fetch_record(&doi).await
    }

    async fn fetch_record(&self, doi: &str) -> Option<String> {
        match self.source.fetch_bibtex(doi).await {
            Ok(Lookup::Found(bibtex)) => Some(bibtex),
            Ok(Lookup::Missing { reason }) => {
                warn!(%doi, %reason, "Record not found; skipping");
                None
            }
            Err(error) => {
                warn!(%doi, error = %error, "Record fetch failed; skipping");
                None
            }
        }
    }

    async fn normalize_text(&self, bibtex: &str, sink: &mut dyn DiagnosticSink) -> String {
        let parsed = parse_bibliography(bibtex);
        report_skipped(&parsed.skipped, sink);
        let normalized = self.normalize_batch(parsed.bibliography, sink).await;
        write_bibliography(&normalized)
    }

    fn progress_bar(&self, len: usize, message: &'static str) -> ProgressBar {
        if !self.show_progress || len == 0 {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(u64::try_from(len).unwrap_or(u64::MAX));
        bar.set_style(
            ProgressStyle::with_template("{msg} [{bar:30}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_message(message);
        bar
    }
}

fn report_skipped(skipped: &[String], sink: &mut dyn DiagnosticSink) {
    for message in skipped {
        sink.report(message);
    }
}

/// Plan for `pdf` whose target is not already planned for another file.
fn unique_plan(pdf: &Path, key: &str, targets: &mut HashSet<PathBuf>) -> RenamePlan {
    let mut plan = RenamePlan::for_key(pdf, key);
    let mut suffix = 1u32;
    while targets.contains(&plan.to) {
        plan = RenamePlan::for_key(pdf, &format!("{key}_{suffix}"));
        suffix += 1;
    }
    if plan.to != plan.from {
        debug!(from = %plan.from.display(), to = %plan.to.display(), "Planned rename");
    }
    targets.insert(plan.to.clone());
    plan
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::*;
    use crate::resolver::{CrossrefReference, NoAbbreviation};

    #[derive(Default)]
    struct StubSource {
        records: HashMap<String, String>,
        references: Option<Vec<CrossrefReference>>,
    }

    #[async_trait]
    impl BibliographySource for StubSource {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn fetch_bibtex(&self, doi: &str) -> Result<Lookup<String>, FetchError> {
            Ok(self
                .records
                .get(doi)
                .cloned()
                .map_or_else(|| Lookup::missing("HTTP 404"), Lookup::Found))
        }

        async fn fetch_reference_list(
            &self,
            _doi: &str,
        ) -> Result<Lookup<Vec<CrossrefReference>>, FetchError> {
            Ok(self
                .references
                .clone()
                .map_or_else(|| Lookup::missing("no reference array"), Lookup::Found))
        }
    }

    fn record(doi: &str, pages: &str) -> String {
        format!(
            "@article{{Smith_2022, title={{A study}}, volume={{10}}, doi={{{doi}}}, \
             journal={{Nature Chemistry}}, author={{Smith, John}}, year={{2022}}, pages={{{pages}}}}}"
        )
    }

    #[tokio::test]
    async fn test_bibtex_for_doi_normalizes_record() {
        let source = StubSource {
            records: HashMap::from([("10.1/a".to_string(), record("10.1/a", "1--2"))]),
            ..StubSource::default()
        };
        let mut sink: Vec<String> = Vec::new();
        let out = Pipeline::new(&source, &NoAbbreviation)
            .bibtex_for_doi("10.1/a", &mut sink)
            .await
            .unwrap();
        assert!(out.starts_with("@article{NC_10_2022_Smith,\n"));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_bibtex_for_doi_not_found_is_error() {
        let source = StubSource::default();
        let error = Pipeline::new(&source, &NoAbbreviation)
            .bibtex_for_doi("10.1/missing", &mut Vec::<String>::new())
            .await
            .unwrap_err();
        assert!(error.to_string().starts_with("Unable to parse bibtex information."));
    }

    #[tokio::test]
    async fn test_references_without_list_is_error() {
        let source = StubSource::default();
        let error = Pipeline::new(&source, &NoAbbreviation)
            .bibtex_for_references("10.1/root", &mut Vec::<String>::new())
            .await
            .unwrap_err();
        assert!(error.to_string().starts_with("Unable to parse reference list."));
    }

    #[tokio::test]
    async fn test_references_split_fetch_and_dedupe() {
        let source = StubSource {
            records: HashMap::from([
                ("10.1/a".to_string(), record("10.1/a", "5--9")),
                ("10.1/b".to_string(), record("10.1/b", "77--80")),
            ]),
            references: Some(vec![
                CrossrefReference {
                    doi: Some("10.1/a".to_string()),
                    ..CrossrefReference::default()
                },
                CrossrefReference {
                    unstructured: Some("Old book, 1950".to_string()),
                    ..CrossrefReference::default()
                },
                CrossrefReference {
                    doi: Some("10.1/b".to_string()),
                    ..CrossrefReference::default()
                },
                CrossrefReference {
                    doi: Some("10.1/gone".to_string()),
                    ..CrossrefReference::default()
                },
            ]),
        };
        let report = Pipeline::new(&source, &NoAbbreviation)
            .bibtex_for_references("10.1/root", &mut Vec::<String>::new())
            .await
            .unwrap();

        assert_eq!(report.without_doi, ["Old book, 1950"]);
        assert_eq!(report.failed, ["10.1/gone"]);
        assert!(report.bibtex.contains("@article{NC_10_2022_Smith,"));
        assert!(report.bibtex.contains("@article{NC_10_2022_Smith_77,"));
    }

    #[tokio::test]
    async fn test_references_all_failed_gives_empty_output() {
        let source = StubSource {
            references: Some(vec![CrossrefReference {
                doi: Some("10.1/none".to_string()),
                ..CrossrefReference::default()
            }]),
            ..StubSource::default()
        };
        let report = Pipeline::new(&source, &NoAbbreviation)
            .bibtex_for_references("10.1/root", &mut Vec::<String>::new())
            .await
            .unwrap();
        assert!(report.bibtex.is_empty());
        assert_eq!(report.failed.len(), 1);
    }

    struct CountingAbbreviations(std::sync::atomic::AtomicUsize);

    #[async_trait]
    impl AbbreviationService for CountingAbbreviations {
        async fn abbreviate(&self, journal: &str) -> String {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            format!("{journal} Abbr.")
        }
    }

    #[tokio::test]
    async fn test_prefetch_abbreviates_each_journal_once() {
        let batch = parse_bibliography(&format!(
            "{}\n{}",
            record("10.1/a", "1"),
            record("10.1/b", "2")
        ))
        .bibliography;
        let service = CountingAbbreviations(std::sync::atomic::AtomicUsize::new(0));
        let source = StubSource::default();
        let table = Pipeline::new(&source, &service)
            .prefetch_abbreviations(&batch)
            .await;
        assert_eq!(table.len(), 1);
        assert_eq!(service.0.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unique_plan_suffixes_repeated_targets() {
        let mut targets = HashSet::new();
        let first = unique_plan(Path::new("dir/a.pdf"), "K", &mut targets);
        let second = unique_plan(Path::new("dir/b.pdf"), "K", &mut targets);
        let third = unique_plan(Path::new("dir/c.pdf"), "K", &mut targets);

        assert_eq!(first.to, Path::new("dir/K.pdf"));
        assert_eq!(second.to, Path::new("dir/K_1.pdf"));
        assert_eq!(third.to, Path::new("dir/K_2.pdf"));
    }
}
