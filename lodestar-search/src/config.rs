//! Retrieval configuration with sensible defaults.
//!
//! [`SearchConfig`] controls the search API endpoint, timeouts, fetch
//! concurrency, rate limiting and caching.

use crate::error::SearchError;

/// Default Serper endpoint.
pub const DEFAULT_API_URL: &str = "https://google.serper.dev/search";

/// Configuration for source retrieval.
///
/// The API key is supplied already resolved; this crate never reads
/// credentials from the environment itself.
#[derive(Clone)]
pub struct SearchConfig {
    /// Search API endpoint.
    pub api_url: String,
    /// Search API key sent as `X-API-KEY`.
    pub api_key: Option<String>,
    /// Number of results requested per search call.
    pub results_per_query: usize,
    /// Country code passed to the search API.
    pub country: String,
    /// Language code passed to the search API.
    pub language: String,
    /// Search API request timeout in seconds.
    pub timeout_seconds: u64,
    /// Per-page fetch timeout in seconds.
    pub fetch_timeout_seconds: u64,
    /// Maximum number of page fetches in flight.
    pub fetch_concurrency: usize,
    /// Minimum spacing between search API calls in milliseconds.
    pub min_interval_ms: u64,
    /// How long to cache search results in seconds. Set to 0 to disable caching.
    pub cache_ttl_seconds: u64,
    /// Below this many sources a deeper search is attempted.
    pub min_sources_per_query: usize,
    /// Below this many direct hits an expanded query is tried.
    pub target_sources_per_query: usize,
    /// Custom User-Agent string. If `None`, rotates through a built-in list.
    pub user_agent: Option<String>,
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("results_per_query", &self.results_per_query)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("fetch_timeout_seconds", &self.fetch_timeout_seconds)
            .field("fetch_concurrency", &self.fetch_concurrency)
            .field("min_interval_ms", &self.min_interval_ms)
            .field("cache_ttl_seconds", &self.cache_ttl_seconds)
            .finish_non_exhaustive()
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            api_key: None,
            results_per_query: 10,
            country: "us".to_owned(),
            language: "en".to_owned(),
            timeout_seconds: 15,
            fetch_timeout_seconds: 10,
            fetch_concurrency: 5,
            min_interval_ms: 1000,
            cache_ttl_seconds: 600,
            min_sources_per_query: 5,
            target_sources_per_query: 7,
            user_agent: None,
        }
    }
}

impl SearchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.api_url.trim().is_empty() {
            return Err(SearchError::Config("api_url must not be empty".into()));
        }
        if self.results_per_query == 0 {
            return Err(SearchError::Config(
                "results_per_query must be greater than 0".into(),
            ));
        }
        if self.timeout_seconds == 0 || self.fetch_timeout_seconds == 0 {
            return Err(SearchError::Config(
                "timeouts must be greater than 0".into(),
            ));
        }
        if self.fetch_concurrency == 0 {
            return Err(SearchError::Config(
                "fetch_concurrency must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// The API key, or a config error when none was supplied.
    pub fn require_api_key(&self) -> Result<&str, SearchError> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(SearchError::Config("search API key is not set".into())),
        }
    }
}
