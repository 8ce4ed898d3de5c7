//! Deterministic citation key de-duplication across one batch.
//!
//! A key that collides with an earlier key gets `_{disambiguator}` appended:
//! the first page of the `pages` range, or, without pages, the first five word
//! characters of the title. Should that still collide (same first page, or no
//! usable disambiguator), `_1`, `_2`, ... is appended until the key is free.

use std::collections::HashSet;

use crate::bibtex::BibEntry;

use super::text::clean_text;

const TITLE_PREFIX_LEN: usize = 5;

/// A key rewritten by [`resolve_duplicate_keys`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRename {
    /// Position of the entry in the batch.
    pub index: usize,
    pub from: String,
    pub to: String,
}

/// Makes every key in `entries` unique, in batch order.
///
/// Earlier entries win: only the later member of a collision is renamed, and
/// comparisons include keys produced by earlier renames. A batch of one entry
/// is returned untouched.
pub fn resolve_duplicate_keys(entries: &mut [BibEntry]) -> Vec<KeyRename> {
    let mut renames = Vec::new();
    if entries.len() <= 1 {
        return renames;
    }

    let mut seen: HashSet<String> = HashSet::with_capacity(entries.len());
    for (index, entry) in entries.iter_mut().enumerate() {
        if !seen.contains(&entry.key) {
            seen.insert(entry.key.clone());
            continue;
        }

        let new_key = free_key(&entry.key, &disambiguator(entry), &seen);
        seen.insert(new_key.clone());
        renames.push(KeyRename {
            index,
            from: std::mem::replace(&mut entry.key, new_key.clone()),
            to: new_key,
        });
    }

    renames
}

/// First page of `pages`, else the title prefix. May be empty.
fn disambiguator(entry: &BibEntry) -> String {
    if let Some(pages) = entry.get("pages") {
        return first_page(pages);
    }
    entry
        .get("title")
        .map(|title| clean_text(title).chars().take(TITLE_PREFIX_LEN).collect())
        .unwrap_or_default()
}

fn first_page(pages: &str) -> String {
    pages
        .split("--")
        .next()
        .and_then(|first| first.split('\u{2013}').next())
        .unwrap_or_default()
        .trim()
        .replace(char::is_whitespace, "")
}

fn free_key(key: &str, disambiguator: &str, seen: &HashSet<String>) -> String {
    let base = if disambiguator.is_empty() {
        key.to_string()
    } else {
        format!("{key}_{disambiguator}")
    };
    if !disambiguator.is_empty() && !seen.contains(&base) {
        return base;
    }

    (1u32..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| !seen.contains(candidate))
        .unwrap_or(base)
}
