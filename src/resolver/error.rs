//! Error types for upstream lookups.
//!
//! Messages follow the What/Why/Suggestion pattern used across the project.

use thiserror::Error;

/// Errors raised while talking to Crossref or the abbreviation service.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed
    #[error("failed to build HTTP client: {reason}\n  Suggestion: {suggestion}")]
    ClientBuild {
        /// Why construction failed
        reason: String,
        /// How to fix the issue
        suggestion: String,
    },

    /// The request never produced a response
    #[error("request to '{url}' failed: {reason}\n  Suggestion: {suggestion}")]
    Transport {
        /// The requested URL
        url: String,
        /// Why the request failed
        reason: String,
        /// How to fix the issue
        suggestion: String,
    },

    /// A response arrived but its body could not be read or decoded
    #[error("could not decode response from '{url}': {reason}")]
    Decode {
        /// The requested URL
        url: String,
        /// What went wrong while decoding
        reason: String,
    },
}

impl FetchError {
    /// Creates a `ClientBuild` error.
    #[must_use]
    pub fn client_build(reason: &str) -> Self {
        Self::ClientBuild {
            reason: reason.to_string(),
            suggestion: "Check proxy environment variables (HTTPS_PROXY, ALL_PROXY)".to_string(),
        }
    }

    /// Creates a `Transport` error from a failed request.
    #[must_use]
    pub fn transport(url: &str, error: &reqwest::Error) -> Self {
        let suggestion = if error.is_timeout() {
            "The server did not answer in time. Raise read_timeout_secs or try again later"
        } else if error.is_connect() {
            "Cannot reach the server. Check your network connection"
        } else {
            "Try again later; pass -v for request details"
        };
        Self::Transport {
            url: url.to_string(),
            reason: error.to_string(),
            suggestion: suggestion.to_string(),
        }
    }

    /// Creates a `Decode` error.
    #[must_use]
    pub fn decode(url: &str, reason: impl Into<String>) -> Self {
        Self::Decode {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}
