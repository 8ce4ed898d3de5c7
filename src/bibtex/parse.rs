//! BibTeX text parsing into ordered [`Bibliography`] entries.

use super::{BibEntry, Bibliography, Delimiter, Field};

const IGNORED_BLOCK_TYPES: [&str; 3] = ["comment", "preamble", "string"];

/// Batch parse result for BibTeX input.
#[derive(Debug, Clone, Default)]
pub struct BibtexParseResult {
    /// Parsed entries in input order.
    pub bibliography: Bibliography,
    /// Actionable parse/skip messages.
    pub skipped: Vec<String>,
}

/// Parses BibTeX entries from input text.
///
/// Malformed entries are reported in [`BibtexParseResult::skipped`] and do not
/// prevent the remaining entries from being parsed. `@comment`, `@preamble`,
/// and `@string` blocks are ignored.
#[tracing::instrument(skip(input), fields(input_len = input.len()))]
#[must_use]
pub fn parse_bibliography(input: &str) -> BibtexParseResult {
    let mut result = BibtexParseResult::default();
    let segments = segment_entries(input);

    for raw_entry in &segments {
        match parse_entry(raw_entry) {
            EntryOutcome::Parsed(entry) => result.bibliography.entries.push(entry),
            EntryOutcome::Ignore => {}
            EntryOutcome::Skip(message) => result.skipped.push(message),
        }
    }

    result
}

#[derive(Debug)]
enum EntryOutcome {
    Parsed(BibEntry),
    Ignore,
    Skip(String),
}

fn segment_entries(input: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut entries = Vec::new();
    let mut i = 0usize;

    while i < chars.len() {
        if chars[i].1 != '@' {
            i += 1;
            continue;
        }

        let mut j = i + 1;
        while j < chars.len() && chars[j].1.is_ascii_alphabetic() {
            j += 1;
        }
        while j < chars.len() && chars[j].1.is_whitespace() {
            j += 1;
        }

        if j >= chars.len() || chars[j].1 != '{' {
            i += 1;
            continue;
        }

        let start = chars[i].0;
        let mut depth = 0usize;
        let mut in_quotes = false;
        let mut escape = false;
        let mut found_end = None;

        for (k, (_, ch)) in chars.iter().enumerate().skip(j) {
            if escape {
                escape = false;
                continue;
            }
            if *ch == '\\' {
                escape = true;
                continue;
            }
            // Quotes only delimit values at the top level of an entry body.
            if *ch == '"' && depth == 1 {
                in_quotes = !in_quotes;
                continue;
            }
            if in_quotes {
                continue;
            }
            if *ch == '{' {
                depth += 1;
                continue;
            }
            if *ch == '}' {
                if depth == 0 {
                    break;
                }
                depth -= 1;
                if depth == 0 {
                    found_end = Some(k);
                    break;
                }
            }
        }

        if let Some(end_index) = found_end {
            let end_exclusive = if end_index + 1 < chars.len() {
                chars[end_index + 1].0
            } else {
                input.len()
            };
            entries.push(input[start..end_exclusive].trim().to_string());
            i = end_index + 1;
        } else {
            // Unbalanced entry: consume up to the next `@` at line start so the
            // following entries still parse.
            // Starts past `i`, so `recovery - 1` below is always in bounds.
            let mut recovery = i + 1;
            while recovery < chars.len() {
                if chars[recovery].1 == '@' && matches!(chars[recovery - 1].1, '\n' | '\r') {
                    break;
                }
                recovery += 1;
            }

            if recovery < chars.len() {
                let end_exclusive = chars[recovery].0;
                entries.push(input[start..end_exclusive].trim().to_string());
                i = recovery;
                continue;
            }

            entries.push(input[start..].trim().to_string());
            break;
        }
    }

    entries
}

fn parse_entry(raw_entry: &str) -> EntryOutcome {
    let trimmed = raw_entry.trim();
    let Some(at_pos) = trimmed.find('@') else {
        return EntryOutcome::Skip(
            "What: malformed BibTeX entry. Why: missing '@type{...}' prefix. Fix: start entries with @article{key, ...}."
                .to_string(),
        );
    };
    let after_at = &trimmed[at_pos + 1..];
    let Some(brace_pos) = after_at.find('{') else {
        return EntryOutcome::Skip(format!(
            "What: malformed BibTeX entry `{}`. Why: missing opening '{{' after entry type. Fix: use `@type{{key, field = value}}`.",
            preview(trimmed)
        ));
    };

    let entry_type = after_at[..brace_pos].trim().to_ascii_lowercase();
    if IGNORED_BLOCK_TYPES.contains(&entry_type.as_str()) {
        return EntryOutcome::Ignore;
    }

    if !trimmed.ends_with('}') {
        return EntryOutcome::Skip(format!(
            "What: malformed BibTeX entry `{}`. Why: unbalanced braces (entry never closed). Fix: ensure each '{{' has a matching '}}'.",
            preview(trimmed)
        ));
    }
    let body = &after_at[brace_pos + 1..];
    let body = &body[..body.len().saturating_sub(1)];
    let (key_raw, fields_raw) = body.split_once(',').unwrap_or((body, ""));

    let key = key_raw.trim();
    if key.is_empty() {
        return EntryOutcome::Skip(format!(
            "What: malformed BibTeX entry `{}`. Why: empty citation key. Fix: provide a non-empty key before the first comma.",
            preview(trimmed)
        ));
    }

    let fields = match parse_fields(fields_raw) {
        Ok(fields) => fields,
        Err(reason) => {
            return EntryOutcome::Skip(format!(
                "What: malformed BibTeX field assignment in `{}`. Why: {}. Fix: use `field = {{value}}` or `field = \"value\"` with commas between fields.",
                preview(trimmed),
                reason
            ));
        }
    };

    let mut entry = BibEntry::new(entry_type, key);
    for field in fields {
        // First-value-wins per standard BibTeX convention.
        if entry.get(&field.name).is_none() {
            entry.push_field(field);
        }
    }
    EntryOutcome::Parsed(entry)
}

fn parse_fields(input: &str) -> Result<Vec<Field>, String> {
    let mut pairs = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut escape = false;

    for ch in input.chars() {
        if escape {
            current.push(ch);
            escape = false;
            continue;
        }
        if ch == '\\' {
            current.push(ch);
            escape = true;
            continue;
        }
        if ch == '"' && depth == 0 {
            in_quotes = !in_quotes;
            current.push(ch);
            continue;
        }
        if !in_quotes {
            if ch == '{' {
                depth += 1;
            } else if ch == '}' {
                if depth == 0 {
                    return Err("closing brace without matching opening brace".to_string());
                }
                depth -= 1;
            } else if ch == ',' && depth == 0 {
                let segment = current.trim();
                if !segment.is_empty() {
                    pairs.push(segment.to_string());
                }
                current.clear();
                continue;
            }
        }
        current.push(ch);
    }

    if in_quotes {
        return Err("unterminated quoted value".to_string());
    }
    if depth != 0 {
        return Err("unbalanced braces in field values".to_string());
    }

    let tail = current.trim();
    if !tail.is_empty() {
        pairs.push(tail.to_string());
    }

    let mut fields = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let Some((name, value_raw)) = pair.split_once('=') else {
            return Err(format!("missing '=' in field segment `{pair}`"));
        };
        let field_name = name.trim().to_ascii_lowercase();
        if field_name.is_empty() {
            return Err("empty field name".to_string());
        }
        let (value, delimiter) = strip_bibtex_value(value_raw)
            .ok_or_else(|| format!("invalid value in field `{field_name}`"))?;
        fields.push(Field {
            name: field_name,
            value,
            delimiter,
        });
    }

    Ok(fields)
}

fn strip_bibtex_value(value: &str) -> Option<(String, Delimiter)> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.len() >= 2 && trimmed.starts_with('{') && trimmed.ends_with('}') && is_single_group(trimmed) {
        let inner = trimmed[1..trimmed.len() - 1].trim().to_string();
        return Some((inner, Delimiter::Braces));
    }
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') && !trimmed.contains('#') {
        let inner = trimmed[1..trimmed.len() - 1].trim().to_string();
        return Some((inner, Delimiter::Quotes));
    }

    Some((trimmed.to_string(), Delimiter::Bare))
}

/// True when the opening brace at index 0 closes at the final character,
/// so `{a} # {b}` is not mistaken for one braced value.
fn is_single_group(value: &str) -> bool {
    let mut depth = 0usize;
    let mut escape = false;
    let last = value.len() - 1;
    for (idx, ch) in value.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' => escape = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return idx == last;
                }
            }
            _ => {}
        }
    }
    false
}

fn preview(input: &str) -> String {
    const MAX: usize = 80;
    if input.chars().count() <= MAX {
        return input.to_string();
    }
    let shortened: String = input.chars().take(MAX).collect();
    format!("{shortened}...")
}
