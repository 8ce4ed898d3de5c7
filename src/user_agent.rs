//! Shared User-Agent string for every upstream request.
//!
//! Crossref asks clients to identify themselves; one format keeps Crossref and
//! abbreviation traffic consistent.

/// Project URL advertised in the User-Agent.
const PROJECT_UA_URL: &str = "https://github.com/fierce/bibfetch";

/// Default User-Agent for HTTP requests.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("bibfetch/{version} (research-tool; +{PROJECT_UA_URL})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_contains_version_and_url() {
        let ua = default_user_agent();
        assert!(ua.contains(PROJECT_UA_URL), "UA must contain project URL");
        assert_eq!(
            env!("CARGO_PKG_VERSION"),
            ua.strip_prefix("bibfetch/")
                .and_then(|s| s.split(' ').next())
                .expect("UA has version"),
            "UA must contain crate version"
        );
    }

    #[test]
    fn test_user_agent_identifies_as_research_tool() {
        let ua = default_user_agent();
        assert!(ua.contains("research-tool"), "unexpected UA: {ua}");
    }
}
