//! Crossref client: BibTeX records via content negotiation and reference lists
//! from the works API.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::http_client::HttpResponse;
use super::{BibliographySource, FetchError, HttpFetcher, Lookup};

/// Default Crossref API base URL.
pub(crate) const DEFAULT_BASE_URL: &str = "https://api.crossref.org";

const BIBTEX_MEDIA_TYPE: &str = "application/x-bibtex";
const JSON_MEDIA_TYPE: &str = "application/json";

// ==================== Crossref API Response Types ====================

/// Top-level works response.
#[derive(Debug, Deserialize)]
struct WorksResponse {
    message: WorksMessage,
}

/// The `message` field of a works response; only the references matter here.
#[derive(Debug, Deserialize)]
struct WorksMessage {
    reference: Option<Vec<CrossrefReference>>,
}

/// One entry of a work's reference list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrossrefReference {
    /// The DOI field is uppercase in the Crossref response.
    #[serde(rename = "DOI")]
    pub doi: Option<String>,
    pub key: Option<String>,
    pub unstructured: Option<String>,
    pub author: Option<String>,
    pub year: Option<String>,
    pub journal_title: Option<String>,
    pub article_title: Option<String>,
}

impl fmt::Display for CrossrefReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = &self.unstructured {
            return f.write_str(text.trim());
        }
        let parts: Vec<&str> = [
            self.author.as_deref(),
            self.article_title.as_deref(),
            self.journal_title.as_deref(),
            self.year.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();
        if !parts.is_empty() {
            return f.write_str(&parts.join(", "));
        }
        f.write_str(self.key.as_deref().unwrap_or("(unidentified reference)"))
    }
}

// ==================== CrossrefClient ====================

/// Looks up DOIs in the Crossref REST API.
///
/// # Polite Pool
///
/// When a `mailto` address is configured it is sent as a query parameter,
/// which places requests in Crossref's polite pool.
pub struct CrossrefClient {
    http: Arc<HttpFetcher>,
    base_url: String,
    mailto: Option<String>,
}

impl CrossrefClient {
    /// Creates a client for the public Crossref API.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] if `mailto` contains control characters.
    #[tracing::instrument(skip_all, fields(mailto))]
    pub fn new(http: Arc<HttpFetcher>, mailto: Option<String>) -> Result<Self, FetchError> {
        Self::with_base_url(http, mailto, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] if `mailto` contains control characters.
    #[tracing::instrument(skip_all, fields(mailto, base_url))]
    pub fn with_base_url(
        http: Arc<HttpFetcher>,
        mailto: Option<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, FetchError> {
        if mailto
            .as_deref()
            .is_some_and(|m| m.chars().any(|c| c == '\n' || c == '\r' || c == '\0'))
        {
            return Err(FetchError::client_build(
                "mailto contains invalid control characters",
            ));
        }
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            http,
            base_url,
            mailto,
        })
    }

    fn works_url(&self, doi: &str, suffix: &str) -> String {
        let mut url = format!(
            "{}/works/{}{}",
            self.base_url,
            urlencoding::encode(doi),
            suffix
        );
        if let Some(mailto) = &self.mailto {
            url.push_str("?mailto=");
            url.push_str(&urlencoding::encode(mailto));
        }
        url
    }
}

impl fmt::Debug for CrossrefClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrossrefClient")
            .field("base_url", &self.base_url)
            .field("mailto", &self.mailto)
            .finish_non_exhaustive()
    }
}

fn status_reason(status: u16) -> String {
    match status {
        400 => "Crossref rejected the DOI as malformed".to_string(),
        404 => "DOI not found in Crossref database".to_string(),
        429 => "Crossref rate limit exceeded. Try again in a few seconds.".to_string(),
        s if s >= 500 => "Crossref API unavailable. Try again later.".to_string(),
        s => format!("Crossref API returned HTTP {s}"),
    }
}

fn parse_reference_list(response: &HttpResponse) -> Lookup<Vec<CrossrefReference>> {
    if !response.is_success() {
        return Lookup::missing(status_reason(response.status));
    }
    match serde_json::from_str::<WorksResponse>(&response.body) {
        Ok(WorksResponse {
            message: WorksMessage {
                reference: Some(references),
            },
        }) => Lookup::Found(references),
        Ok(_) => Lookup::missing("Crossref record has no reference list"),
        Err(error) => Lookup::missing(format!("Crossref response is not valid JSON: {error}")),
    }
}

#[async_trait]
impl BibliographySource for CrossrefClient {
    fn name(&self) -> &'static str {
        "crossref"
    }

    #[tracing::instrument(skip(self), fields(source = "crossref", doi = %doi))]
    async fn fetch_bibtex(&self, doi: &str) -> Result<Lookup<String>, FetchError> {
        let url = self.works_url(doi, "/transform/application/x-bibtex");
        debug!(api_url = %url, "Fetching BibTeX from Crossref");

        let response = self.http.get(&url, BIBTEX_MEDIA_TYPE).await?;
        if !response.is_success() {
            let reason = status_reason(response.status);
            warn!(status = response.status, %reason, "BibTeX lookup failed");
            return Ok(Lookup::missing(reason));
        }
        if response.body.trim().is_empty() {
            return Ok(Lookup::missing("Crossref returned an empty record"));
        }
        Ok(Lookup::Found(response.body))
    }

    #[tracing::instrument(skip(self), fields(source = "crossref", doi = %doi))]
    async fn fetch_reference_list(
        &self,
        doi: &str,
    ) -> Result<Lookup<Vec<CrossrefReference>>, FetchError> {
        let url = self.works_url(doi, "");
        debug!(api_url = %url, "Fetching reference list from Crossref");

        let response = self.http.get(&url, JSON_MEDIA_TYPE).await?;
        let lookup = parse_reference_list(&response);
        match &lookup {
            Lookup::Found(references) => debug!(count = references.len(), "Parsed reference list"),
            Lookup::Missing { reason } => warn!(status = response.status, %reason, "Reference list unavailable"),
        }
        Ok(lookup)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(mailto: Option<&str>) -> CrossrefClient {
        CrossrefClient::with_base_url(
            Arc::new(HttpFetcher::uncached().unwrap()),
            mailto.map(str::to_string),
            "https://api.example.org/",
        )
        .unwrap()
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            body: body.to_string(),
            from_cache: false,
        }
    }

    #[test]
    fn test_works_url_encodes_doi_and_mailto() {
        let url = client(Some("a b@example.com")).works_url("10.1000/xyz", "");
        assert_eq!(
            url,
            "https://api.example.org/works/10.1000%2Fxyz?mailto=a%20b%40example.com"
        );
    }

    #[test]
    fn test_works_url_without_mailto() {
        let url = client(None).works_url("10.1/a", "/transform/application/x-bibtex");
        assert_eq!(
            url,
            "https://api.example.org/works/10.1%2Fa/transform/application/x-bibtex"
        );
    }

    #[test]
    fn test_constructor_rejects_control_characters_in_mailto() {
        let result = CrossrefClient::new(
            Arc::new(HttpFetcher::uncached().unwrap()),
            Some("bad\nmail@example.com".to_string()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_reference_list_found() {
        let body = r#"{"status":"ok","message":{"reference":[
            {"key":"r1","DOI":"10.1000/a","unstructured":"A. Author, J. 1 (2000)"},
            {"key":"r2","journal-title":"Nature","year":"1999"}
        ]}}"#;
        let Lookup::Found(refs) = parse_reference_list(&response(200, body)) else {
            panic!("expected references");
        };
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].doi.as_deref(), Some("10.1000/a"));
        assert_eq!(refs[1].doi, None);
        assert_eq!(refs[1].journal_title.as_deref(), Some("Nature"));
    }

    #[test]
    fn test_parse_reference_list_without_reference_array_is_missing() {
        let body = r#"{"status":"ok","message":{"title":["x"]}}"#;
        assert!(parse_reference_list(&response(200, body)).found().is_none());
    }

    #[test]
    fn test_parse_reference_list_non_success_is_missing() {
        let lookup = parse_reference_list(&response(404, "Resource not found."));
        assert_eq!(
            lookup,
            Lookup::missing("DOI not found in Crossref database")
        );
    }

    #[test]
    fn test_parse_reference_list_invalid_json_is_missing() {
        assert!(parse_reference_list(&response(200, "<html>")).found().is_none());
    }

    #[test]
    fn test_reference_display_prefers_unstructured() {
        let reference = CrossrefReference {
            unstructured: Some(" Smith, J. Chem. 2020 ".to_string()),
            key: Some("r1".to_string()),
            ..CrossrefReference::default()
        };
        assert_eq!(reference.to_string(), "Smith, J. Chem. 2020");
    }

    #[test]
    fn test_reference_display_joins_parts_then_key() {
        let parts = CrossrefReference {
            author: Some("Doe".to_string()),
            journal_title: Some("Nature".to_string()),
            year: Some("1999".to_string()),
            ..CrossrefReference::default()
        };
        assert_eq!(parts.to_string(), "Doe, Nature, 1999");

        let key_only = CrossrefReference {
            key: Some("ref12".to_string()),
            ..CrossrefReference::default()
        };
        assert_eq!(key_only.to_string(), "ref12");
    }

    #[test]
    fn test_status_reason_messages() {
        assert!(status_reason(404).contains("not found"));
        assert!(status_reason(503).contains("unavailable"));
        assert_eq!(status_reason(418), "Crossref API returned HTTP 418");
    }
}
