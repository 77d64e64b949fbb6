//! Core types for search results and retrieved sources.

use serde::{Deserialize, Serialize};

/// A single organic result returned by a search backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// The title of the result page.
    pub title: String,
    /// The URL of the result.
    pub url: String,
    /// A text snippet summarising the page content.
    pub snippet: String,
    /// 1-based rank the backend gave this result.
    pub position: usize,
}

/// Extracted readable content from a fetched web page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageContent {
    /// The URL that was fetched.
    pub url: String,
    /// The page title extracted from HTML.
    pub title: String,
    /// Cleaned, readable text with boilerplate stripped.
    pub text: String,
    /// Number of words in the extracted text.
    pub word_count: usize,
}

/// A retrieved web source, as it moves from search through scoring.
///
/// Scores are attached by consuming builder methods, so a scored
/// candidate is never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCandidate {
    pub url: String,
    pub title: String,
    pub snippet: String,
    /// Extracted page text, or the snippet when extraction failed.
    pub raw_content: String,
    pub extraction_succeeded: bool,
    /// Why extraction failed, when it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_error: Option<String>,
    pub search_position: usize,
    #[serde(default)]
    pub relevance_score: Option<f64>,
    #[serde(default)]
    pub quality_score: Option<f64>,
}

impl SourceCandidate {
    /// Candidate for a search hit whose page has not been fetched yet.
    pub fn from_result(result: SearchResult) -> Self {
        Self {
            url: result.url,
            title: result.title,
            snippet: result.snippet,
            raw_content: String::new(),
            extraction_succeeded: false,
            extraction_error: None,
            search_position: result.position,
            relevance_score: None,
            quality_score: None,
        }
    }

    /// Attach successfully extracted page text.
    pub fn with_content(mut self, text: String) -> Self {
        self.raw_content = text;
        self.extraction_succeeded = true;
        self.extraction_error = None;
        self
    }

    /// Fall back to the search snippet after a failed fetch.
    pub fn degraded(mut self, error: impl Into<String>) -> Self {
        self.raw_content = self.snippet.clone();
        self.extraction_succeeded = false;
        self.extraction_error = Some(error.into());
        self
    }

    pub fn with_relevance(mut self, score: f64) -> Self {
        self.relevance_score = Some(score);
        self
    }

    pub fn with_quality(mut self, score: f64) -> Self {
        self.quality_score = Some(score);
        self
    }

    /// Relevance score, or 0.0 when the candidate was never ranked.
    pub fn relevance(&self) -> f64 {
        self.relevance_score.unwrap_or(0.0)
    }

    /// Length of the carried content in characters.
    pub fn content_len(&self) -> usize {
        self.raw_content.chars().count()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn hit() -> SearchResult {
        SearchResult {
            title: "Rust Book".into(),
            url: "https://doc.rust-lang.org/book/".into(),
            snippet: "Learn Rust".into(),
            position: 2,
        }
    }

    #[test]
    fn from_result_starts_unscored_and_unfetched() {
        let candidate = SourceCandidate::from_result(hit());
        assert_eq!(candidate.search_position, 2);
        assert!(!candidate.extraction_succeeded);
        assert!(candidate.raw_content.is_empty());
        assert!(candidate.relevance_score.is_none());
        assert!(candidate.quality_score.is_none());
    }

    #[test]
    fn degraded_falls_back_to_snippet() {
        let candidate = SourceCandidate::from_result(hit()).degraded("timeout");
        assert_eq!(candidate.raw_content, "Learn Rust");
        assert!(!candidate.extraction_succeeded);
        assert_eq!(candidate.extraction_error.as_deref(), Some("timeout"));
    }

    #[test]
    fn content_len_counts_chars_not_bytes() {
        let candidate = SourceCandidate::from_result(hit()).with_content("héllo".into());
        assert_eq!(candidate.content_len(), 5);
        assert!(candidate.extraction_succeeded);
    }

    #[test]
    fn candidate_deserializes_without_scores() {
        let json = r#"{"url":"https://a.org","title":"A","snippet":"s","raw_content":"c",
            "extraction_succeeded":true,"search_position":1}"#;
        let candidate: SourceCandidate = serde_json::from_str(json).unwrap();
        assert_eq!(candidate.relevance(), 0.0);
        assert!(candidate.extraction_error.is_none());
    }
}
