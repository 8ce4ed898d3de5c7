//! ISO-4 journal abbreviations from the abbreviso web service.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{AbbreviationService, HttpFetcher};

/// Default abbreviso base URL.
pub(crate) const DEFAULT_BASE_URL: &str = "https://abbreviso.toolforge.org";

const TEXT_MEDIA_TYPE: &str = "text/plain";

/// Queries `{base}/abbreviso/a/{journal}` for a journal abbreviation.
pub struct AbbrevisoClient {
    http: Arc<HttpFetcher>,
    base_url: String,
}

impl AbbrevisoClient {
    #[must_use]
    pub fn new(http: Arc<HttpFetcher>) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    #[must_use]
    pub fn with_base_url(http: Arc<HttpFetcher>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    fn abbreviation_url(&self, journal: &str) -> String {
        format!("{}/abbreviso/a/{}", self.base_url, urlencoding::encode(journal))
    }
}

impl fmt::Debug for AbbrevisoClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbbrevisoClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AbbreviationService for AbbrevisoClient {
    #[tracing::instrument(skip(self), fields(service = "abbreviso"))]
    async fn abbreviate(&self, journal: &str) -> String {
        let url = self.abbreviation_url(journal);
        match self.http.get(&url, TEXT_MEDIA_TYPE).await {
            Ok(response) if response.is_success() && !response.body.trim().is_empty() => {
                let abbreviation = response.body.trim().to_string();
                debug!(%abbreviation, "Journal abbreviated");
                abbreviation
            }
            Ok(response) => {
                warn!(
                    journal,
                    status = response.status,
                    "Journal abbreviation unavailable; keeping full name"
                );
                journal.to_string()
            }
            Err(error) => {
                warn!(journal, error = %error, "Journal abbreviation request failed; keeping full name");
                journal.to_string()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_abbreviation_url_encodes_journal() {
        let client = AbbrevisoClient::with_base_url(
            Arc::new(HttpFetcher::uncached().unwrap()),
            "http://localhost:1/",
        );
        assert_eq!(
            client.abbreviation_url("The Journal of Physical Chemistry A"),
            "http://localhost:1/abbreviso/a/The%20Journal%20of%20Physical%20Chemistry%20A"
        );
    }

    #[tokio::test]
    async fn test_abbreviate_falls_back_when_unreachable() {
        let client = AbbrevisoClient::with_base_url(
            Arc::new(HttpFetcher::uncached().unwrap()),
            "http://127.0.0.1:9",
        );
        assert_eq!(client.abbreviate("Nature").await, "Nature");
    }
}
