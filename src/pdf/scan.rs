//! Byte-level DOI scanning of PDF files.
//!
//! Only uncompressed content is visible: the document information dictionary,
//! XMP metadata packets, and any plain-text streams. Labelled metadata hits
//! (`/doi`, `prism:doi`, `dc:identifier`) win over the first DOI in the file.

use std::path::Path;

use tracing::{debug, instrument};

use crate::parser::extract_dois;

use super::{PdfDoiExtractor, PdfError};

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Metadata labels that usually precede the document's own DOI.
const METADATA_MARKERS: [&str; 3] = ["prism:doi", "/doi", "dc:identifier"];

/// How far past a marker to look for the DOI.
const MARKER_WINDOW: usize = 256;

/// Scans the raw bytes of a PDF for a DOI.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanningExtractor;

impl ScanningExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl PdfDoiExtractor for ScanningExtractor {
    #[instrument(skip(self), fields(path = %path.display()))]
    fn extract_doi(&self, path: &Path) -> Result<Option<String>, PdfError> {
        let bytes = std::fs::read(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                PdfError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                PdfError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        if !bytes.starts_with(PDF_MAGIC) {
            return Err(PdfError::NotPdf {
                path: path.to_path_buf(),
            });
        }

        let doi = scan_for_doi(&String::from_utf8_lossy(&bytes));
        debug!(found = doi.is_some(), "Scanned PDF for DOI");
        Ok(doi)
    }
}

fn scan_for_doi(text: &str) -> Option<String> {
    let lowered = text.to_ascii_lowercase();
    for marker in METADATA_MARKERS {
        for (offset, _) in lowered.match_indices(marker) {
            let start = offset + marker.len();
            let end = floor_char_boundary(text, (start + MARKER_WINDOW).min(text.len()));
            if let Some(doi) = first_valid_doi(&text[start..end]) {
                return Some(doi);
            }
        }
    }
    first_valid_doi(text)
}

fn first_valid_doi(text: &str) -> Option<String> {
    extract_dois(text)
        .into_iter()
        .find_map(Result::ok)
        .map(|found| found.value)
}

/// `to_ascii_lowercase` keeps byte offsets, but the window end may still land
/// inside a multi-byte replacement character.
fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn write_pdf(dir: &tempfile::TempDir, name: &str, body: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut bytes = b"%PDF-1.5\n".to_vec();
        bytes.extend_from_slice(body);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_extract_doi_from_xmp_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdf(
            &dir,
            "a.pdf",
            b"cited 10.9999/other.ref here\n<prism:doi>10.1021/acs.jpca.2c01234</prism:doi>",
        );
        let doi = ScanningExtractor::new().extract_doi(&path).unwrap();
        assert_eq!(doi.as_deref(), Some("10.1021/acs.jpca.2c01234"));
    }

    #[test]
    fn test_extract_doi_falls_back_to_first_doi_in_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdf(&dir, "b.pdf", b"stream\nhttps://doi.org/10.1063/5.0012345 end\n");
        let doi = ScanningExtractor::new().extract_doi(&path).unwrap();
        assert_eq!(doi.as_deref(), Some("10.1063/5.0012345"));
    }

    #[test]
    fn test_extract_doi_none_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdf(&dir, "c.pdf", b"no identifiers \xff\xfe here");
        assert_eq!(ScanningExtractor::new().extract_doi(&path).unwrap(), None);
    }

    #[test]
    fn test_extract_doi_rejects_non_pdf_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, "plain text 10.1000/xyz").unwrap();
        assert!(matches!(
            ScanningExtractor::new().extract_doi(&path),
            Err(PdfError::NotPdf { .. })
        ));
    }

    #[test]
    fn test_extract_doi_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ScanningExtractor::new().extract_doi(&dir.path().join("none.pdf")),
            Err(PdfError::NotFound { .. })
        ));
    }
}
