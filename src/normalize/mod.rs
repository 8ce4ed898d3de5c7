//! Record normalization: citation keys, journal abbreviations, title cleanup,
//! and batch-wide key de-duplication.
//!
//! The normalizer is synchronous and performs no I/O. Journal abbreviations
//! are supplied through [`JournalAbbreviator`], usually an
//! [`AbbreviationTable`] filled by the shell before the batch is normalized.
//!
//! # Example
//!
//! ```
//! use bibfetch_core::normalize::{IdentityAbbreviator, Normalizer};
//!
//! let input = "@article{x, journal={Physical Review Letters}, author={Doe, Jane}, \
//!              volume={120}, year={2018}, title={A result}}";
//! let mut diagnostics: Vec<String> = Vec::new();
//! let output = Normalizer::new(&IdentityAbbreviator).reconfigure(input, &mut diagnostics);
//!
//! assert!(output.starts_with("@article{PRL_120_2018_Doe,"));
//! assert!(diagnostics.is_empty());
//! ```

mod dedupe;
mod diagnostics;
mod key;
mod text;

pub use dedupe::{KeyRename, resolve_duplicate_keys};
pub use diagnostics::{DiagnosticSink, TracingSink};
pub use key::{
    AbbreviationTable, CitationKey, IdentityAbbreviator, JournalAbbreviator, REQUIRED_FIELDS,
    build_citation_key, first_author_surname, shorten_journal,
};
pub use text::{clean_text, clean_title};

use tracing::debug;

use crate::bibtex::{BibEntry, Bibliography, parse_bibliography, write_bibliography};

/// Result of normalizing one record.
///
/// `diagnostics` is empty when the record was fully normalized. Otherwise the
/// record is returned exactly as it came in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    pub entry: BibEntry,
    pub diagnostics: Vec<String>,
}

impl RecordOutcome {
    #[must_use]
    pub fn is_normalized(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Applies key construction and cleanup to records and batches.
pub struct Normalizer<'a> {
    abbreviator: &'a dyn JournalAbbreviator,
}

impl<'a> Normalizer<'a> {
    #[must_use]
    pub fn new(abbreviator: &'a dyn JournalAbbreviator) -> Self {
        Self { abbreviator }
    }

    /// Normalizes a single record: key, abbreviated journal, cleaned title.
    #[must_use]
    pub fn normalize_record(&self, mut entry: BibEntry) -> RecordOutcome {
        match build_citation_key(&entry, self.abbreviator) {
            Ok(CitationKey { key, journal }) => {
                entry.set("journal", journal);
                if let Some(title) = entry.get("title") {
                    let cleaned = clean_title(title);
                    entry.set("title", cleaned);
                }
                entry.key = key;
                RecordOutcome {
                    entry,
                    diagnostics: Vec::new(),
                }
            }
            Err(missing) => {
                let subject = entry.doi().map_or_else(
                    || format!("entry `{}` (no doi)", entry.key),
                    |doi| format!("doi: {doi}"),
                );
                let diagnostics = missing
                    .into_iter()
                    .map(|field| format!("Key '{field}' not found for {subject}"))
                    .collect();
                RecordOutcome { entry, diagnostics }
            }
        }
    }

    /// Normalizes every record, then de-duplicates keys across the batch.
    ///
    /// Records with missing fields keep their original key and still take part
    /// in de-duplication. Each missing field is reported once to `sink`.
    pub fn normalize(
        &self,
        bibliography: Bibliography,
        sink: &mut dyn DiagnosticSink,
    ) -> Bibliography {
        let mut entries: Vec<BibEntry> = Vec::with_capacity(bibliography.len());
        for entry in bibliography.entries {
            let outcome = self.normalize_record(entry);
            for message in &outcome.diagnostics {
                sink.report(message);
            }
            entries.push(outcome.entry);
        }

        for rename in resolve_duplicate_keys(&mut entries) {
            debug!(index = rename.index, from = %rename.from, to = %rename.to, "Renamed duplicate citation key");
        }

        Bibliography::new(entries)
    }

    /// Parses BibTeX text, normalizes the batch, and serializes it again.
    ///
    /// Unparseable entries are reported to `sink` and left out of the output.
    #[must_use]
    pub fn reconfigure(&self, bibtex: &str, sink: &mut dyn DiagnosticSink) -> String {
        let parsed = parse_bibliography(bibtex);
        for message in &parsed.skipped {
            sink.report(message);
        }
        write_bibliography(&self.normalize(parsed.bibliography, sink))
    }
}
