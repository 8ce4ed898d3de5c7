//! DOI extraction from local PDF files.
//!
//! PDF support is an optional capability selected by the `pdf` cargo feature
//! (on by default). Callers ask [`PdfSupport::detect`] before resolving files
//! and get a readable reason when the capability is missing.

#[cfg(feature = "pdf")]
mod scan;

#[cfg(feature = "pdf")]
pub use scan::ScanningExtractor;

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while validating or reading PDF inputs.
#[derive(Debug, Error)]
pub enum PdfError {
    /// The path does not name a PDF file
    #[error("'{path}' is not a PDF file\n  Suggestion: pass files ending in .pdf")]
    NotPdf { path: PathBuf },

    /// The file does not exist
    #[error("file '{path}' does not exist\n  Suggestion: check the path and try again")]
    NotFound { path: PathBuf },

    /// The file exists but could not be read
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// PDF support is not compiled in
    #[error("PDF support is unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Finds the DOI of a PDF document.
pub trait PdfDoiExtractor: Send + Sync {
    /// Returns the document's DOI, or `None` when none can be found.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError`] when the file is missing, unreadable, or not a PDF.
    fn extract_doi(&self, path: &Path) -> Result<Option<String>, PdfError>;
}

/// Whether PDF-to-DOI resolution can run in this build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfSupport {
    Available,
    Unavailable { reason: String },
}

impl PdfSupport {
    #[must_use]
    pub fn detect() -> Self {
        if cfg!(feature = "pdf") {
            Self::Available
        } else {
            Self::Unavailable {
                reason: "bibfetch was built without the `pdf` feature; rebuild with `--features pdf`"
                    .to_string(),
            }
        }
    }

    /// Converts the capability into a result.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::Unavailable`] with the recorded reason.
    pub fn require(&self) -> Result<(), PdfError> {
        match self {
            Self::Available => Ok(()),
            Self::Unavailable { reason } => Err(PdfError::Unavailable {
                reason: reason.clone(),
            }),
        }
    }
}

/// Returns the built-in extractor for this build.
///
/// # Errors
///
/// Returns [`PdfError::Unavailable`] when PDF support is not compiled in.
pub fn default_extractor() -> Result<Box<dyn PdfDoiExtractor>, PdfError> {
    PdfSupport::detect().require()?;
    #[cfg(feature = "pdf")]
    {
        Ok(Box::new(ScanningExtractor::new()))
    }
    #[cfg(not(feature = "pdf"))]
    {
        Err(PdfError::Unavailable {
            reason: "no PDF extractor compiled in".to_string(),
        })
    }
}

/// Checks that every path ends in `.pdf` and exists, before any network work.
///
/// # Errors
///
/// Returns the first [`PdfError::NotPdf`] or [`PdfError::NotFound`] encountered.
pub fn check_pdf_inputs<P: AsRef<Path>>(paths: &[P]) -> Result<(), PdfError> {
    for path in paths {
        let path = path.as_ref();
        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            return Err(PdfError::NotPdf {
                path: path.to_path_buf(),
            });
        }
        if !path.is_file() {
            return Err(PdfError::NotFound {
                path: path.to_path_buf(),
            });
        }
    }
    Ok(())
}
