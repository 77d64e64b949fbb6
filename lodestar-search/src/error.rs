//! Error types for the lodestar-search crate.
//!
//! Messages are stable strings. API keys never appear in them.

/// Errors that can occur while searching for or fetching sources.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Every search attempt for a query failed.
    #[error("all search backends failed: {0}")]
    AllBackendsFailed(String),

    /// A search call or page fetch exceeded its time limit.
    #[error("search timed out: {0}")]
    Timeout(String),

    /// An HTTP request failed or returned a non-success status.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A response body could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid search configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias for lodestar-search results.
pub type Result<T> = std::result::Result<T, SearchError>;
