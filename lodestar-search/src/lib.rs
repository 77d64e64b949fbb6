//! # lodestar-search
//!
//! Source retrieval for Lodestar research runs.
//!
//! This crate turns a sub-question into a ranked list of web sources: it
//! queries a search API, fetches and cleans every hit, and scores each
//! source for lexical relevance to the question.
//!
//! ## Design
//!
//! - Search goes through the [`SearchBackend`] trait; [`SerperBackend`] is
//!   the bundled implementation
//! - Page fetching goes through [`PageFetcher`]; [`HttpFetcher`] strips
//!   boilerplate HTML and navigation noise
//! - Fetches run concurrently on a bounded pool with per-fetch timeouts;
//!   a failed fetch degrades to the search snippet
//! - Search calls are serialized by a minimum-interval rate limiter and
//!   cached in memory with a configurable TTL
//!
//! ## Security
//!
//! - The API key is passed in by the caller and redacted from `Debug` output
//! - Search queries are logged only at trace level

pub mod cache;
pub mod config;
pub mod content;
pub mod engine;
pub mod engines;
pub mod error;
pub mod fetch;
pub mod http;
pub mod orchestrator;
pub mod query;
pub mod rate_limit;
pub mod types;

pub use config::SearchConfig;
pub use engine::{PageFetcher, SearchBackend};
pub use engines::SerperBackend;
pub use error::{Result, SearchError};
pub use fetch::HttpFetcher;
pub use orchestrator::dedup::dedupe;
pub use orchestrator::gather::{GatherLimits, QuestionSources, SourceGatherer};
pub use orchestrator::scoring::{rank_by_relevance, relevance_score};
pub use types::{PageContent, SearchResult, SourceCandidate};

/// Run a single search against the configured Serper endpoint.
///
/// # Errors
///
/// Returns [`SearchError::Config`] if the config is invalid or has no API
/// key, or the backend's error if the request fails.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> lodestar_search::Result<()> {
/// let config = lodestar_search::SearchConfig {
///     api_key: std::env::var("LODESTAR_SEARCH_API_KEY").ok(),
///     ..Default::default()
/// };
/// for result in lodestar_search::search("rust ownership", &config).await? {
///     println!("{}: {}", result.title, result.url);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn search(query: &str, config: &SearchConfig) -> Result<Vec<SearchResult>> {
    config.validate()?;
    let backend = SerperBackend::new(config)?;
    backend.search(&query::sanitize_query(query)).await
}

/// Fetch a page and extract at most `max_chars` characters of readable text.
///
/// # Errors
///
/// Returns [`SearchError::Http`] if the page cannot be fetched, or
/// [`SearchError::Parse`] if it has no extractable content.
pub async fn fetch_page_content(url: &str, config: &SearchConfig, max_chars: usize) -> Result<PageContent> {
    let fetcher = HttpFetcher::new(config)?;
    fetcher.fetch(url, max_chars).await
}
