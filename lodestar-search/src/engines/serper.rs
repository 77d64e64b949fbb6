//! Serper.dev Google search API backend.
//!
//! Sends a JSON POST with the query and reads the `organic` result array.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::SearchConfig;
use crate::engine::SearchBackend;
use crate::error::SearchError;
use crate::http;
use crate::types::SearchResult;

/// Serper search API client.
pub struct SerperBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    num: usize,
    country: String,
    language: String,
}

#[derive(Debug, Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
    num: usize,
    gl: &'a str,
    hl: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

impl SerperBackend {
    /// Create a backend from the retrieval config.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] when no API key is configured, or
    /// [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let api_key = config.require_api_key()?.to_owned();
        let client = http::build_client(config, Duration::from_secs(config.timeout_seconds))?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key,
            num: config.results_per_query,
            country: config.country.clone(),
            language: config.language.clone(),
        })
    }
}

impl SearchBackend for SerperBackend {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        tracing::trace!(query, "Serper search");

        let body = SerperRequest {
            q: query,
            num: self.num,
            gl: &self.country,
            hl: &self.language,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("X-API-KEY", &self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout(format!("Serper request timed out: {e}"))
                } else {
                    SearchError::Http(format!("Serper request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Http(format!("Serper returned HTTP {status}")));
        }

        let text = response
            .text()
            .await
            .map_err(|e| SearchError::Http(format!("Serper response read failed: {e}")))?;

        tracing::trace!(bytes = text.len(), "Serper response received");

        parse_serper_json(&text, self.num)
    }

    fn name(&self) -> &'static str {
        "serper"
    }
}

/// Parse a Serper JSON response body into search results.
///
/// Results without a link are skipped. A missing title or snippet gets a
/// placeholder so downstream scoring always has text to work with.
///
/// # Errors
///
/// Returns [`SearchError::Parse`] if the body is not valid JSON.
pub fn parse_serper_json(body: &str, max_results: usize) -> Result<Vec<SearchResult>, SearchError> {
    let parsed: SerperResponse = serde_json::from_str(body)
        .map_err(|e| SearchError::Parse(format!("invalid Serper response: {e}")))?;

    let results = parsed
        .organic
        .into_iter()
        .filter_map(|item| {
            let url = item.link.map(|l| l.trim().to_owned())?;
            if url.is_empty() {
                return None;
            }
            Some((url, item.title, item.snippet))
        })
        .take(max_results)
        .enumerate()
        .map(|(i, (url, title, snippet))| SearchResult {
            title: title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| "No title".to_owned()),
            url,
            snippet: snippet
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "No snippet".to_owned()),
            position: i + 1,
        })
        .collect();

    Ok(results)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    const BODY: &str = r#"{
        "searchParameters": {"q": "rust async"},
        "organic": [
            {"title": "Async Book", "link": "https://rust-lang.github.io/async-book/", "snippet": "Asynchronous Programming in Rust", "position": 1},
            {"title": "No link here", "snippet": "dropped"},
            {"link": "https://tokio.rs/tokio/tutorial", "snippet": "Tokio tutorial"},
            {"title": "Blank", "link": "   "}
        ]
    }"#;

    #[test]
    fn parses_organic_results_in_order() {
        let results = parse_serper_json(BODY, 10).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://rust-lang.github.io/async-book/");
        assert_eq!(results[0].position, 1);
        assert_eq!(results[1].title, "No title");
        assert_eq!(results[1].position, 2);
    }

    #[test]
    fn respects_max_results() {
        let results = parse_serper_json(BODY, 1).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn missing_organic_is_empty() {
        let results = parse_serper_json(r#"{"answerBox": {}}"#, 10).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn invalid_json_is_parse_error() {
        let err = parse_serper_json("<html>rate limited</html>", 10).unwrap_err();
        assert!(matches!(err, SearchError::Parse(_)));
    }

    #[test]
    fn new_requires_api_key() {
        let config = SearchConfig::default();
        assert!(matches!(
            SerperBackend::new(&config),
            Err(SearchError::Config(_))
        ));
    }
}
