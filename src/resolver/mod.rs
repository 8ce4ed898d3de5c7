//! Upstream lookups: BibTeX records and reference lists from Crossref, and
//! ISO-4 journal abbreviations from abbreviso.
//!
//! # Architecture
//!
//! - [`BibliographySource`] - async trait for record and reference-list lookups
//! - [`CrossrefClient`] - the Crossref REST implementation
//! - [`AbbreviationService`] - async trait for journal abbreviations
//! - [`AbbrevisoClient`] - the abbreviso implementation
//! - [`HttpFetcher`] - shared client with the optional response cache
//!
//! Service base URLs are constructor parameters so tests can point clients at
//! a mock server.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use bibfetch_core::resolver::{BibliographySource, CrossrefClient, HttpFetcher, Lookup};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let http = Arc::new(HttpFetcher::uncached()?);
//! let crossref = CrossrefClient::new(http, Some("me@example.com".to_string()))?;
//! if let Lookup::Found(bibtex) = crossref.fetch_bibtex("10.1021/acs.jpca.1c00001").await? {
//!     println!("{bibtex}");
//! }
//! # Ok(())
//! # }
//! ```

mod abbreviso;
mod crossref;
mod error;
mod http_client;

pub use abbreviso::AbbrevisoClient;
pub use crossref::{CrossrefClient, CrossrefReference};
pub use error::FetchError;
pub use http_client::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_READ_TIMEOUT_SECS, HttpFetcher, HttpResponse,
    HttpSettings, build_http_client,
};

use async_trait::async_trait;

/// Outcome of a lookup that reached the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    /// The server returned the requested resource.
    Found(T),
    /// The server answered, but without a usable resource.
    Missing {
        /// Human-readable explanation (status or shape problem).
        reason: String,
    },
}

impl<T> Lookup<T> {
    /// Creates a `Missing` lookup.
    #[must_use]
    pub fn missing(reason: impl Into<String>) -> Self {
        Self::Missing {
            reason: reason.into(),
        }
    }

    /// Returns the found value, if any.
    #[must_use]
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Missing { .. } => None,
        }
    }
}

/// Retrieves bibliographic records by DOI.
#[async_trait]
pub trait BibliographySource: Send + Sync {
    /// Short name for logging.
    fn name(&self) -> &str;

    /// Fetches the BibTeX record for `doi`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when no response could be obtained.
    async fn fetch_bibtex(&self, doi: &str) -> Result<Lookup<String>, FetchError>;

    /// Fetches the reference list of the work identified by `doi`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when no response could be obtained.
    async fn fetch_reference_list(
        &self,
        doi: &str,
    ) -> Result<Lookup<Vec<CrossrefReference>>, FetchError>;
}

/// Maps full journal names to their abbreviations over the network.
///
/// Implementations never fail: on any problem they log it and return the
/// journal name unchanged.
#[async_trait]
pub trait AbbreviationService: Send + Sync {
    async fn abbreviate(&self, journal: &str) -> String;
}

/// Abbreviation service that leaves every journal name as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAbbreviation;

#[async_trait]
impl AbbreviationService for NoAbbreviation {
    async fn abbreviate(&self, journal: &str) -> String {
        journal.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_found_returns_value() {
        assert_eq!(Lookup::Found(3).found(), Some(3));
    }

    #[test]
    fn test_lookup_missing_returns_none() {
        let lookup: Lookup<String> = Lookup::missing("HTTP 404");
        assert_eq!(
            lookup,
            Lookup::Missing {
                reason: "HTTP 404".to_string()
            }
        );
        assert_eq!(lookup.found(), None);
    }

    #[tokio::test]
    async fn test_no_abbreviation_is_identity() {
        assert_eq!(NoAbbreviation.abbreviate("Nature Physics").await, "Nature Physics");
    }
}
