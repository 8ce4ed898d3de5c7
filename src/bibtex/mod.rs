//! BibTeX entry model, parsing, and serialization.
//!
//! Entries keep their fields in source order and remember how each value was
//! delimited, so a parse followed by [`write_bibliography`] reproduces every
//! field value byte-for-byte.
//!
//! # Example
//!
//! ```
//! use bibfetch_core::bibtex::{parse_bibliography, write_bibliography};
//!
//! let parsed = parse_bibliography("@article{k, title={A Title}, year={2024}}");
//! assert_eq!(parsed.bibliography.len(), 1);
//!
//! let text = write_bibliography(&parsed.bibliography);
//! assert!(text.starts_with("@article{k,"));
//! ```

mod parse;
mod write;

pub use parse::{BibtexParseResult, parse_bibliography};
pub use write::{write_bibliography, write_entry};

/// How a field value was delimited in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// `field = {value}`
    Braces,
    /// `field = "value"`
    Quotes,
    /// `field = value` (numbers, month macros, `#` concatenations)
    Bare,
}

/// A single `name = value` pair of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Lower-cased field name.
    pub name: String,
    /// Value text without its outer delimiters.
    pub value: String,
    /// Original delimiter, reused on serialization.
    pub delimiter: Delimiter,
}

/// One bibliography entry: `@type{key, fields...}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibEntry {
    /// Lower-cased entry type (`article`, `book`, ...).
    pub entry_type: String,
    /// Citation key (`ID`).
    pub key: String,
    fields: Vec<Field>,
}

impl BibEntry {
    /// Creates an entry without fields.
    #[must_use]
    pub fn new(entry_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            entry_type: entry_type.into(),
            key: key.into(),
            fields: Vec::new(),
        }
    }

    /// Builder-style helper that appends a braced field.
    #[must_use]
    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Returns the value of `name` (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.name.eq_ignore_ascii_case(name))
            .map(|field| field.value.as_str())
    }

    /// Replaces the value of `name` in place, or appends a braced field.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(field) = self
            .fields
            .iter_mut()
            .find(|field| field.name.eq_ignore_ascii_case(name))
        {
            field.value = value;
            return;
        }
        self.fields.push(Field {
            name: name.to_ascii_lowercase(),
            value,
            delimiter: Delimiter::Braces,
        });
    }

    /// Fields in source order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// The `doi` field, if any.
    #[must_use]
    pub fn doi(&self) -> Option<&str> {
        self.get("doi")
    }

    pub(crate) fn push_field(&mut self, field: Field) {
        self.fields.push(field);
    }
}

/// Ordered collection of entries. Order is insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bibliography {
    pub entries: Vec<BibEntry>,
}

impl Bibliography {
    #[must_use]
    pub fn new(entries: Vec<BibEntry>) -> Self {
        Self { entries }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_existing_field_in_place() {
        let mut entry = BibEntry::new("article", "k")
            .with_field("title", "Old")
            .with_field("year", "2024");
        entry.set("TITLE", "New");

        assert_eq!(entry.get("title"), Some("New"));
        assert_eq!(entry.fields()[0].name, "title");
        assert_eq!(entry.fields().len(), 2);
    }

    #[test]
    fn test_set_appends_missing_field_lowercased() {
        let mut entry = BibEntry::new("article", "k");
        entry.set("Journal", "Nature");

        assert_eq!(entry.fields()[0].name, "journal");
        assert_eq!(entry.fields()[0].delimiter, Delimiter::Braces);
    }

    #[test]
    fn test_get_is_case_insensitive() {
        let entry = BibEntry::new("article", "k").with_field("doi", "10.1234/x");
        assert_eq!(entry.get("DOI"), Some("10.1234/x"));
        assert_eq!(entry.doi(), Some("10.1234/x"));
        assert_eq!(entry.get("pages"), None);
    }
}
