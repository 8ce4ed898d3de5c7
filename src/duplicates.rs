//! Duplicate detection across one or more BibTeX files.
//!
//! Entries are grouped when they share a DOI (case-insensitive) or a citation
//! key. Titles are compared pairwise after stripping markup and case; pairs at
//! or above [`TITLE_SIMILARITY_THRESHOLD`] are reported unless the pair was
//! already grouped by DOI.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::bibtex::BibEntry;
use crate::normalize::clean_text;

/// Minimum normalized Levenshtein similarity for two titles to match.
pub const TITLE_SIMILARITY_THRESHOLD: f64 = 0.95;

/// An entry together with the file it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedEntry {
    pub source: String,
    pub entry: BibEntry,
}

/// Why entries were grouped.
#[derive(Debug, Clone, PartialEq)]
pub enum DuplicateReason {
    Doi(String),
    Key(String),
    Title { similarity: f64 },
}

/// Entries considered to describe the same work.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateGroup {
    pub reason: DuplicateReason,
    /// Indices into the slice given to [`find_duplicates`], ascending.
    pub members: Vec<usize>,
}

impl DuplicateGroup {
    /// Renders the group for terminal output.
    #[must_use]
    pub fn describe(&self, entries: &[LocatedEntry]) -> String {
        let mut lines = vec![self.reason.to_string()];
        for &index in &self.members {
            if let Some(located) = entries.get(index) {
                lines.push(format!("  {}: {}", located.source, located.entry.key));
            }
        }
        lines.join("\n")
    }
}

impl fmt::Display for DuplicateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Doi(doi) => write!(f, "Same DOI {doi}:"),
            Self::Key(key) => write!(f, "Same key {key}:"),
            Self::Title { similarity } => {
                write!(f, "Similar titles ({:.0}% match):", similarity * 100.0)
            }
        }
    }
}

/// Finds duplicate groups, ordered DOI groups first, then key groups, then
/// title pairs, each in order of first appearance.
#[must_use]
pub fn find_duplicates(entries: &[LocatedEntry]) -> Vec<DuplicateGroup> {
    let mut groups = Vec::new();

    let doi_groups = group_by(entries, |e| e.doi().map(str::to_lowercase));
    let mut same_doi: HashSet<(usize, usize)> = HashSet::new();
    for (doi, members) in doi_groups {
        for (i, &a) in members.iter().enumerate() {
            for &b in &members[i + 1..] {
                same_doi.insert((a, b));
            }
        }
        groups.push(DuplicateGroup {
            reason: DuplicateReason::Doi(doi),
            members,
        });
    }

    for (key, members) in group_by(entries, |e| Some(e.key.clone())) {
        groups.push(DuplicateGroup {
            reason: DuplicateReason::Key(key),
            members,
        });
    }

    let titles: Vec<Option<String>> = entries
        .iter()
        .map(|located| normalized_title(&located.entry))
        .collect();
    for (a, title_a) in titles.iter().enumerate() {
        let Some(title_a) = title_a else { continue };
        for (b, title_b) in titles.iter().enumerate().skip(a + 1) {
            let Some(title_b) = title_b else { continue };
            if same_doi.contains(&(a, b)) {
                continue;
            }
            let similarity = strsim::normalized_levenshtein(title_a, title_b);
            if similarity >= TITLE_SIMILARITY_THRESHOLD {
                groups.push(DuplicateGroup {
                    reason: DuplicateReason::Title { similarity },
                    members: vec![a, b],
                });
            }
        }
    }

    groups
}

/// Groups indices by `key_of`, keeping groups with two or more members.
fn group_by<F>(entries: &[LocatedEntry], key_of: F) -> Vec<(String, Vec<usize>)>
where
    F: Fn(&BibEntry) -> Option<String>,
{
    let mut order: Vec<String> = Vec::new();
    let mut members: HashMap<String, Vec<usize>> = HashMap::new();
    for (index, located) in entries.iter().enumerate() {
        let Some(key) = key_of(&located.entry).filter(|k| !k.is_empty()) else {
            continue;
        };
        let slot = members.entry(key.clone()).or_default();
        if slot.is_empty() {
            order.push(key);
        }
        slot.push(index);
    }
    order
        .into_iter()
        .filter_map(|key| {
            let group = members.remove(&key)?;
            (group.len() > 1).then_some((key, group))
        })
        .collect()
}

fn normalized_title(entry: &BibEntry) -> Option<String> {
    let title = clean_text(entry.get("title")?).to_lowercase();
    (!title.is_empty()).then_some(title)
}
