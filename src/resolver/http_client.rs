//! Shared HTTP client construction and cached GET requests.
//!
//! Every upstream call goes through [`HttpFetcher`], so timeouts, the user
//! agent, compression, proxy fallback, and the response cache are applied the
//! same way for Crossref and the abbreviation service.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{Client, ClientBuilder, Proxy};
use tracing::{debug, warn};

use crate::cache::ResponseCache;
use crate::user_agent;

use super::FetchError;

/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Default whole-request timeout.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;

/// Network timeouts for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
        }
    }
}

/// Builds the HTTP client used for all upstream requests.
///
/// # Errors
///
/// Returns [`FetchError::ClientBuild`] when client construction fails.
pub fn build_http_client(settings: HttpSettings) -> Result<Client, FetchError> {
    let user_agent = user_agent::default_user_agent();

    match try_build_client(&user_agent, settings, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Panic) => {
            // Some sandboxed environments panic when querying system proxy
            // settings. Env proxies still apply on the fallback path.
            warn!("HTTP client hit system proxy panic; using env-proxy fallback builder");
            match try_build_client(&user_agent, settings, true) {
                Ok(client) => Ok(client),
                Err(BuildClientFailure::Panic) => Err(FetchError::client_build(
                    "HTTP client construction panicked while initializing networking",
                )),
                Err(BuildClientFailure::Build(error)) => Err(FetchError::client_build(&format!(
                    "HTTP client construction failed: {error}"
                ))),
            }
        }
        Err(BuildClientFailure::Build(error)) => Err(FetchError::client_build(&format!(
            "HTTP client construction failed: {error}"
        ))),
    }
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

fn try_build_client(
    user_agent: &str,
    settings: HttpSettings,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    let user_agent = user_agent.to_string();
    catch_unwind(AssertUnwindSafe(move || {
        let mut builder = base_builder(user_agent, settings);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(user_agent: String, settings: HttpSettings) -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
        .timeout(Duration::from_secs(settings.read_timeout_secs))
        .user_agent(user_agent)
        .gzip(true)
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = env_proxy_for_scheme("https")
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = env_proxy_for_scheme("http")
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn env_proxy_for_scheme(scheme: &str) -> Option<String> {
    match scheme {
        "https" => find_first_proxy_var(&["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"]),
        "http" => find_first_proxy_var(&["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"]),
        _ => None,
    }
}

fn find_first_proxy_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

/// Status and body of a GET request, live or cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    pub from_cache: bool,
}

impl HttpResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// GET requests with an optional response cache in front.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    cache: Option<ResponseCache>,
}

impl HttpFetcher {
    #[must_use]
    pub fn new(client: Client, cache: Option<ResponseCache>) -> Self {
        Self { client, cache }
    }

    /// Fetcher with default settings and no cache.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] when client construction fails.
    pub fn uncached() -> Result<Self, FetchError> {
        Ok(Self::new(build_http_client(HttpSettings::default())?, None))
    }

    /// Sends a GET request for `url`.
    ///
    /// Non-success statuses are returned, not raised. Cache failures are
    /// logged and the request goes to the network.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] when no response arrives and
    /// [`FetchError::Decode`] when the body cannot be read as text.
    #[tracing::instrument(skip(self), fields(url = %url))]
    pub async fn get(&self, url: &str, accept: &str) -> Result<HttpResponse, FetchError> {
        let cache_key = ResponseCache::cache_key(accept, url);

        if let Some(cache) = &self.cache {
            match cache.get(&cache_key).await {
                Ok(Some(hit)) => {
                    debug!(status = hit.status, "Serving response from cache");
                    return Ok(HttpResponse {
                        status: hit.status,
                        body: hit.body,
                        from_cache: true,
                    });
                }
                Ok(None) => {}
                Err(error) => warn!(error = %error, "Response cache lookup failed"),
            }
        }

        let response = self
            .client
            .get(url)
            .header(ACCEPT, accept)
            .send()
            .await
            .map_err(|error| FetchError::transport(url, &error))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|error| FetchError::decode(url, error.to_string()))?;
        debug!(status, bytes = body.len(), "Received response");

        if let Some(cache) = &self.cache
            && let Err(error) = cache.store(&cache_key, url, status, &body).await
        {
            warn!(error = %error, "Response cache store failed");
        }

        Ok(HttpResponse {
            status,
            body,
            from_cache: false,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = HttpSettings::default();
        assert_eq!(settings.connect_timeout_secs, 10);
        assert_eq!(settings.read_timeout_secs, 30);
    }

    #[test]
    fn test_build_http_client_with_custom_timeouts() {
        let settings = HttpSettings {
            connect_timeout_secs: 1,
            read_timeout_secs: 2,
        };
        assert!(build_http_client(settings).is_ok());
    }

    #[test]
    fn test_http_response_is_success() {
        let ok = HttpResponse {
            status: 200,
            body: String::new(),
            from_cache: false,
        };
        let missing = HttpResponse { status: 404, ..ok.clone() };
        assert!(ok.is_success());
        assert!(!missing.is_success());
    }

    #[tokio::test]
    async fn test_get_serves_cached_response_without_network() {
        let cache = ResponseCache::in_memory(Duration::from_secs(60)).await.unwrap();
        // Port 9 is discard; a cache miss here would surface as a transport error.
        let url = "http://127.0.0.1:9/works/10.1000/x";
        let key = ResponseCache::cache_key("text/plain", url);
        cache.store(&key, url, 200, "cached body").await.unwrap();

        let fetcher = HttpFetcher::new(build_http_client(HttpSettings::default()).unwrap(), Some(cache));
        let response = fetcher.get(url, "text/plain").await.unwrap();
        assert!(response.from_cache);
        assert_eq!(response.body, "cached body");
    }
}
