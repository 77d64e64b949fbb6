//! HTTP page fetcher backed by [`crate::content`] extraction.

use std::time::Duration;

use url::Url;

use crate::config::SearchConfig;
use crate::content;
use crate::engine::PageFetcher;
use crate::error::SearchError;
use crate::http;
use crate::types::PageContent;

/// Fetches pages over HTTP(S) and extracts their readable text.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher whose requests time out after `fetch_timeout_seconds`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let client = http::build_client(config, Duration::from_secs(config.fetch_timeout_seconds))?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, max_chars: usize) -> Result<PageContent, SearchError> {
        let parsed = Url::parse(url).map_err(|e| SearchError::Http(format!("invalid URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SearchError::Http(format!(
                "unsupported URL scheme: {}",
                parsed.scheme()
            )));
        }

        let response = self.client.get(parsed).send().await.map_err(|e| {
            if e.is_timeout() {
                SearchError::Timeout(format!("page fetch timed out: {e}"))
            } else {
                SearchError::Http(format!("page fetch failed: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Http(format!("page returned HTTP {status}")));
        }

        let html = response
            .text()
            .await
            .map_err(|e| SearchError::Http(format!("page body read failed: {e}")))?;

        tracing::trace!(bytes = html.len(), "page fetched");

        content::extract_content(&html, url, max_chars)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[tokio::test]
    async fn rejects_non_http_schemes() {
        let fetcher = HttpFetcher::new(&SearchConfig::default()).unwrap();
        let err = fetcher.fetch("ftp://files.example.com/a.txt", 100).await.unwrap_err();
        assert!(err.to_string().contains("unsupported URL scheme"));
    }

    #[tokio::test]
    async fn rejects_unparsable_urls() {
        let fetcher = HttpFetcher::new(&SearchConfig::default()).unwrap();
        let err = fetcher.fetch("not a url", 100).await.unwrap_err();
        assert!(matches!(err, SearchError::Http(_)));
    }
}
