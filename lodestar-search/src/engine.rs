//! Traits for the two network collaborators of the retrieval stage.
//!
//! [`SearchBackend`] turns a query into ranked hits, [`PageFetcher`]
//! turns a URL into readable text. Both are `Send + Sync` so one
//! instance can serve every concurrent fetch of a run.

use crate::error::SearchError;
use crate::types::{PageContent, SearchResult};

/// A web search provider.
pub trait SearchBackend: Send + Sync {
    /// Run a search and return the provider's organic results in rank order.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the request fails or the response cannot
    /// be parsed.
    fn search(
        &self,
        query: &str,
    ) -> impl std::future::Future<Output = Result<Vec<SearchResult>, SearchError>> + Send;

    /// Short name used in logs and cache keys.
    fn name(&self) -> &'static str;
}

/// Downloads a page and extracts its readable text.
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and return at most `max_chars` characters of extracted text.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the page cannot be fetched or has no
    /// extractable content.
    fn fetch(
        &self,
        url: &str,
        max_chars: usize,
    ) -> impl std::future::Future<Output = Result<PageContent, SearchError>> + Send;
}
