//! Integration tests for normalization through the public API.

use bibfetch_core::bibtex::{BibEntry, Bibliography, parse_bibliography, write_bibliography};
use bibfetch_core::normalize::{
    AbbreviationTable, IdentityAbbreviator, Normalizer, clean_title, first_author_surname,
    shorten_journal,
};

const TWO_SMITH_PAPERS: &str = r"
@article{Smith_2022a,
  title = {Water dimer dissociation},
  volume = {10},
  doi = {10.1021/jp.1},
  journal = {The Journal of Physical Chemistry A},
  author = {Smith, John and Doe, Jane},
  year = {2022},
  pages = {100--110}
}

@article{Smith_2022b,
  title = {Ozone photolysis},
  volume = {10},
  doi = {10.1021/jp.2},
  journal = {The Journal of Physical Chemistry A},
  author = {Smith, J.},
  year = 2022,
  pages = {1234--1240}
}
";

fn jpca_table() -> AbbreviationTable {
    let mut table = AbbreviationTable::new();
    table.insert("The Journal of Physical Chemistry A", "J. Phys. Chem. A");
    table
}

#[test]
fn test_documented_examples() {
    assert_eq!(shorten_journal("The Journal of Physical Chemistry A"), "TJoPCA");
    assert_eq!(first_author_surname("Smith, J. and Doe, A."), "Smith");
}

#[test]
fn test_colliding_keys_get_page_disambiguator() {
    let table = jpca_table();
    let mut diagnostics: Vec<String> = Vec::new();
    let output = Normalizer::new(&table).reconfigure(TWO_SMITH_PAPERS, &mut diagnostics);

    let reparsed = parse_bibliography(&output).bibliography;
    let keys: Vec<&str> = reparsed.entries.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(keys, ["JPCA_10_2022_Smith", "JPCA_10_2022_Smith_1234"]);
    assert!(diagnostics.is_empty());
}

#[test]
fn test_single_record_batch_is_not_deduplicated() {
    let batch = Bibliography::new(vec![
        BibEntry::new("article", "x")
            .with_field("journal", "Nature")
            .with_field("author", "Doe, J.")
            .with_field("volume", "1")
            .with_field("year", "2000")
            .with_field("pages", "1--2"),
    ]);
    let out = Normalizer::new(&IdentityAbbreviator).normalize(batch, &mut Vec::<String>::new());
    assert_eq!(out.entries[0].key, "N_1_2000_Doe");
}

#[test]
fn test_missing_volume_is_reported_and_batch_continues() {
    let input = r"
@article{keep_me, title = {No volume}, doi = {10.1/nv}, journal = {Nature}, author = {Doe, J.}, year = {1999}}
@article{other, title = {Fine}, volume = {3}, journal = {Nature}, author = {Roe, R.}, year = {2001}}
";
    let mut diagnostics: Vec<String> = Vec::new();
    let output = Normalizer::new(&IdentityAbbreviator).reconfigure(input, &mut diagnostics);

    assert_eq!(diagnostics, ["Key 'volume' not found for doi: 10.1/nv"]);
    let reparsed = parse_bibliography(&output).bibliography;
    assert_eq!(reparsed.entries[0].key, "keep_me");
    assert_eq!(reparsed.entries[0].get("title"), Some("No volume"));
    assert_eq!(reparsed.entries[1].key, "N_3_2001_Roe");
}

#[test]
fn test_clean_title_idempotent_without_legacy_markup() {
    for title in [
        "Plain title",
        "H$_{2}$O photodissociation",
        "The \\emph{ab initio} route",
        "CO$^{+}$ states",
    ] {
        let once = clean_title(title);
        assert_eq!(clean_title(&once), once);
    }
}

#[test]
fn test_round_trip_preserves_untouched_fields() {
    let table = jpca_table();
    let original = parse_bibliography(TWO_SMITH_PAPERS).bibliography;
    let output = Normalizer::new(&table).reconfigure(TWO_SMITH_PAPERS, &mut Vec::<String>::new());
    let normalized = parse_bibliography(&output).bibliography;

    assert_eq!(original.len(), normalized.len());
    for (before, after) in original.entries.iter().zip(&normalized.entries) {
        for field in before.fields() {
            if matches!(field.name.as_str(), "journal" | "title") {
                continue;
            }
            assert_eq!(after.get(&field.name), Some(field.value.as_str()), "field {}", field.name);
        }
        assert_eq!(after.fields().len(), before.fields().len());
    }

    // Serializing the normalized batch again is stable.
    assert_eq!(write_bibliography(&normalized), output);
}
