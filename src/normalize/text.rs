//! Text cleanup rules shared by key construction and title rewriting.

use std::sync::LazyLock;

use regex::Regex;

#[allow(clippy::expect_used)]
static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\W+").expect("non-word regex is valid"));

// Crossref renders inline JATS markup as `$\less$tag$\greater$...$\less$/tag$\greater$`.
#[allow(clippy::expect_used)]
static SUBSCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\\less\$sub\$\\greater\$(.*?)\$\\less\$/sub\$\\greater\$")
        .expect("subscript regex is valid")
});
#[allow(clippy::expect_used)]
static SUPERSCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\\less\$sup\$\\greater\$(.*?)\$\\less\$/sup\$\\greater\$")
        .expect("superscript regex is valid")
});
#[allow(clippy::expect_used)]
static ITALIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\\less\$i\$\\greater\$(.*?)\$\\less\$/i\$\\greater\$")
        .expect("italic regex is valid")
});

const MATH_PLUS: &str = r"$\mathplus$";

/// Removes every non-word character (Unicode-aware `\W`).
///
/// Letters with diacritics written as LaTeX escapes lose their accent
/// (`{\"o}` becomes `o`); that loss is accepted for keys and file names.
#[must_use]
pub fn clean_text(text: &str) -> String {
    NON_WORD.replace_all(text, "").into_owned()
}

/// Rewrites Crossref's legacy inline markup into LaTeX and joins lines.
///
/// - sub spans become `$_{...}$`
/// - sup spans become `$^{...}$`
/// - italic spans become `\emph{...}`
/// - `$\mathplus$` becomes `+`
/// - newlines become spaces
///
/// Unrecognized markup passes through unchanged.
#[must_use]
pub fn clean_title(title: &str) -> String {
    let text = SUBSCRIPT.replace_all(title, "$$_{${1}}$$");
    let text = SUPERSCRIPT.replace_all(&text, "$$^{${1}}$$");
    let text = ITALIC.replace_all(&text, r"\emph{${1}}");
    text.replace(MATH_PLUS, "+").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_strips_punctuation_and_spaces() {
        assert_eq!(clean_text("J. Phys. Chem. A"), "JPhysChemA");
        assert_eq!(clean_text("O'Brien-Smith"), "OBrienSmith");
    }

    #[test]
    fn test_clean_text_drops_latex_accent_escapes() {
        assert_eq!(clean_text(r#"M{\"u}ller"#), "Muller");
    }

    #[test]
    fn test_clean_text_keeps_unicode_letters_and_underscore() {
        assert_eq!(clean_text("Müller_2"), "Müller_2");
    }

    #[test]
    fn test_clean_title_subscript() {
        assert_eq!(
            clean_title(r"H$\less$sub$\greater$2$\less$/sub$\greater$O"),
            r"H$_{2}$O"
        );
    }

    #[test]
    fn test_clean_title_superscript() {
        assert_eq!(
            clean_title(r"Ca$\less$sup$\greater$2+$\less$/sup$\greater$ ions"),
            r"Ca$^{2+}$ ions"
        );
    }

    #[test]
    fn test_clean_title_italic() {
        assert_eq!(
            clean_title(r"$\less$i$\greater$ab initio$\less$/i$\greater$ dynamics"),
            r"\emph{ab initio} dynamics"
        );
    }

    #[test]
    fn test_clean_title_math_plus_and_newlines() {
        assert_eq!(
            clean_title("H$\\mathplus$ collisions\nwith He"),
            "H+ collisions with He"
        );
    }

    #[test]
    fn test_clean_title_multiple_spans() {
        assert_eq!(
            clean_title(
                r"CO$\less$sub$\greater$2$\less$/sub$\greater$ and N$\less$sub$\greater$2$\less$/sub$\greater$"
            ),
            r"CO$_{2}$ and N$_{2}$"
        );
    }

    #[test]
    fn test_clean_title_unknown_markup_passes_through() {
        let title = r"Some $\less$b$\greater$bold$\less$/b$\greater$ text";
        assert_eq!(clean_title(title), title);
    }

    #[test]
    fn test_clean_title_is_idempotent() {
        for title in [
            "Plain title",
            "Two\nlines",
            r"Already $_{2}$ and \emph{x}",
            r"H$\less$sub$\greater$2$\less$/sub$\greater$",
        ] {
            let once = clean_title(title);
            assert_eq!(clean_title(&once), once, "not idempotent for {title:?}");
        }
    }
}
