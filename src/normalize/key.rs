//! Citation key construction: `{journal acronym}_{volume}_{year}_{surname}`.

use std::collections::HashMap;

use crate::bibtex::BibEntry;

use super::text::clean_text;

/// Fields that must be present before a key can be built, in lookup order.
pub const REQUIRED_FIELDS: [&str; 4] = ["journal", "author", "volume", "year"];

const AUTHOR_SEPARATOR: &str = " and ";

/// Maps a full journal name to its abbreviated form.
///
/// Implementations never fail: an unknown journal maps to itself.
pub trait JournalAbbreviator {
    fn abbreviate(&self, journal: &str) -> String;
}

/// Leaves journal names untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityAbbreviator;

impl JournalAbbreviator for IdentityAbbreviator {
    fn abbreviate(&self, journal: &str) -> String {
        journal.to_string()
    }
}

/// Pre-fetched journal abbreviations for one batch.
///
/// Built by the shell before normalization so the core stays free of I/O.
#[derive(Debug, Clone, Default)]
pub struct AbbreviationTable {
    entries: HashMap<String, String>,
}

impl AbbreviationTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, journal: impl Into<String>, abbreviation: impl Into<String>) {
        self.entries.insert(journal.into(), abbreviation.into());
    }

    #[must_use]
    pub fn contains(&self, journal: &str) -> bool {
        self.entries.contains_key(journal)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl JournalAbbreviator for AbbreviationTable {
    fn abbreviate(&self, journal: &str) -> String {
        self.entries
            .get(journal)
            .cloned()
            .unwrap_or_else(|| journal.to_string())
    }
}

/// A key built for one record together with the abbreviated journal name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationKey {
    pub key: String,
    pub journal: String,
}

/// Compresses an (abbreviated) journal name to an acronym.
///
/// Periods are removed, the first character of every word is kept, and any
/// non-word character left over is stripped.
///
/// ```
/// use bibfetch_core::normalize::shorten_journal;
///
/// assert_eq!(shorten_journal("The Journal of Physical Chemistry A"), "TJoPCA");
/// assert_eq!(shorten_journal("J. Phys. Chem. A"), "JPCA");
/// ```
#[must_use]
pub fn shorten_journal(journal: &str) -> String {
    let initials: String = journal
        .replace('.', "")
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .collect();
    clean_text(&initials)
}

/// Surname of the first author in a BibTeX author list.
///
/// The list is cut at the first `" and "`. A `Last, First` name yields the
/// part before the comma, a `First Last` name its final word; in both cases
/// the last whitespace token is kept and stripped of non-word characters.
///
/// ```
/// use bibfetch_core::normalize::first_author_surname;
///
/// assert_eq!(first_author_surname("Smith, J. and Doe, A."), "Smith");
/// assert_eq!(first_author_surname("Jane Doe and John Smith"), "Doe");
/// ```
#[must_use]
pub fn first_author_surname(authors: &str) -> String {
    let first = authors
        .split(AUTHOR_SEPARATOR)
        .next()
        .unwrap_or_default()
        .trim();
    let surname_part = first.split_once(',').map_or(first, |(last, _)| last);
    let token = surname_part.split_whitespace().last().unwrap_or_default();
    clean_text(token)
}

/// Builds the citation key for `entry`.
///
/// # Errors
///
/// Returns the names of all missing [`REQUIRED_FIELDS`], in lookup order.
pub fn build_citation_key(
    entry: &BibEntry,
    abbreviator: &dyn JournalAbbreviator,
) -> Result<CitationKey, Vec<&'static str>> {
    let missing: Vec<&'static str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| entry.get(field).is_none())
        .collect();

    let (Some(journal), Some(authors), Some(volume), Some(year)) = (
        entry.get("journal"),
        entry.get("author"),
        entry.get("volume"),
        entry.get("year"),
    ) else {
        return Err(missing);
    };

    let journal = abbreviator.abbreviate(journal);
    let key = format!(
        "{}_{}_{}_{}",
        shorten_journal(&journal),
        volume,
        year,
        first_author_surname(authors)
    );
    Ok(CitationKey { key, journal })
}
