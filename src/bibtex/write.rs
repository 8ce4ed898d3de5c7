//! BibTeX serialization.

use std::fmt::Write as _;

use super::{BibEntry, Bibliography, Delimiter};

/// Serializes a bibliography, one blank line between entries.
#[must_use]
pub fn write_bibliography(bibliography: &Bibliography) -> String {
    bibliography
        .entries
        .iter()
        .map(write_entry)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serializes one entry as
///
/// ```text
/// @article{KEY,
///  title = {...},
///  year = {2024}
/// }
/// ```
#[must_use]
pub fn write_entry(entry: &BibEntry) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "@{}{{{},", entry.entry_type, entry.key);

    let rendered: Vec<String> = entry
        .fields()
        .iter()
        .map(|field| {
            let value = match field.delimiter {
                Delimiter::Braces => format!("{{{}}}", field.value),
                Delimiter::Quotes => format!("\"{}\"", field.value),
                Delimiter::Bare => field.value.clone(),
            };
            format!(" {} = {}", field.name, value)
        })
        .collect();
    if !rendered.is_empty() {
        out.push_str(&rendered.join(",\n"));
        out.push('\n');
    }
    out.push_str("}\n");
    out
}
