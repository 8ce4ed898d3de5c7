//! Error types for DOI parsing.

use thiserror::Error;

/// Errors that can occur while reading a DOI from user input.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    /// DOI is malformed or invalid
    #[error("invalid DOI '{doi}': {reason}\n  Suggestion: {suggestion}")]
    InvalidDoi {
        /// The DOI that failed validation
        doi: String,
        /// Why the DOI is invalid
        reason: String,
        /// How to fix the issue
        suggestion: String,
    },

    /// No DOI-like text was found at all
    #[error("no DOI found in '{input}'\n  Suggestion: Pass a DOI such as 10.1021/acs.jpca.2c00001")]
    NoDoi {
        /// The input that was searched
        input: String,
    },
}

impl ParseError {
    /// Creates an `InvalidDoi` error with a specific reason.
    #[must_use]
    pub fn invalid_doi(doi: &str, reason: &str) -> Self {
        Self::InvalidDoi {
            doi: doi.to_string(),
            reason: reason.to_string(),
            suggestion: "Check the DOI format (should be 10.XXXX/suffix)".to_string(),
        }
    }

    /// Creates an `InvalidDoi` error for a DOI missing its suffix.
    #[must_use]
    pub fn doi_no_suffix(doi: &str) -> Self {
        Self::InvalidDoi {
            doi: doi.to_string(),
            reason: "DOI has no suffix after the registrant code".to_string(),
            suggestion: "A DOI must have content after the '/' separator".to_string(),
        }
    }

    /// Creates a `NoDoi` error.
    #[must_use]
    pub fn no_doi(input: &str) -> Self {
        Self::NoDoi {
            input: input.chars().take(80).collect(),
        }
    }
}
