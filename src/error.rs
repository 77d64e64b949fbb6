//! Error types for the research pipeline.

/// Top-level error type for a research run.
#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Language model request or response error.
    #[error("LLM error: {0}")]
    Llm(String),

    /// Source retrieval error.
    #[error("search error: {0}")]
    Search(#[from] lodestar_search::SearchError),

    /// Report assembly or persistence error.
    #[error("report error: {0}")]
    Report(String),

    /// A pipeline stage could not produce output.
    #[error("pipeline error: {0}")]
    Pipeline(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ResearchError>;
