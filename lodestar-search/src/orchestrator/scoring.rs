//! Deterministic lexical relevance scoring for retrieved sources.
//!
//! A source is scored against the query it was retrieved for:
//!
//! ```text
//! score = min(title_overlap   * 0.35, 0.35)
//!       + min(content_overlap * 0.40, 0.40)
//!       + min(snippet_overlap * 0.15, 0.15)
//!       + 0.05 if the query phrase occurs in the title
//!       + 0.05 if the query phrase occurs in the content
//!       + 0.05 if extraction succeeded and content is over 500 chars
//! overlap = |query_tokens ∩ field_tokens| / |query_tokens|
//! ```
//!
//! The sum is clamped to `[0, 1]`. Tokens are lowercase whitespace-split
//! words longer than two characters.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::types::SourceCandidate;

const TITLE_WEIGHT: f64 = 0.35;
const CONTENT_WEIGHT: f64 = 0.40;
const SNIPPET_WEIGHT: f64 = 0.15;
const PHRASE_BONUS: f64 = 0.05;
const SUBSTANTIAL_CONTENT_BONUS: f64 = 0.05;
const SUBSTANTIAL_CONTENT_CHARS: usize = 500;

/// Lowercase whitespace-separated words longer than two characters.
pub fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .filter(|word| word.chars().count() > 2)
        .map(str::to_owned)
        .collect()
}

fn overlap_ratio(query: &HashSet<String>, field: &HashSet<String>) -> f64 {
    let shared = query.intersection(field).count();
    shared as f64 / query.len() as f64
}

/// Relevance of `source` to `query`, in `[0, 1]`.
///
/// Returns 0.0 when the query has no token longer than two characters.
pub fn relevance_score(query: &str, source: &SourceCandidate) -> f64 {
    let query_tokens = tokenize(query);
    if query_tokens.is_empty() {
        return 0.0;
    }

    let title_term = overlap_ratio(&query_tokens, &tokenize(&source.title)) * TITLE_WEIGHT;
    let content_term = overlap_ratio(&query_tokens, &tokenize(&source.raw_content)) * CONTENT_WEIGHT;
    let snippet_term = overlap_ratio(&query_tokens, &tokenize(&source.snippet)) * SNIPPET_WEIGHT;

    let mut score = title_term.min(TITLE_WEIGHT)
        + content_term.min(CONTENT_WEIGHT)
        + snippet_term.min(SNIPPET_WEIGHT);

    let phrase = query.to_lowercase();
    if source.title.to_lowercase().contains(&phrase) {
        score += PHRASE_BONUS;
    }
    if source.raw_content.to_lowercase().contains(&phrase) {
        score += PHRASE_BONUS;
    }

    if source.extraction_succeeded && source.content_len() > SUBSTANTIAL_CONTENT_CHARS {
        score += SUBSTANTIAL_CONTENT_BONUS;
    }

    score.clamp(0.0, 1.0)
}

/// Score every source against `query` and sort by relevance, highest first.
///
/// The sort is stable: equally relevant sources keep their input order.
pub fn rank_by_relevance(query: &str, sources: Vec<SourceCandidate>) -> Vec<SourceCandidate> {
    let mut ranked: Vec<SourceCandidate> = sources
        .into_iter()
        .map(|source| {
            let score = relevance_score(query, &source);
            source.with_relevance(score)
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.relevance()
            .partial_cmp(&a.relevance())
            .unwrap_or(Ordering::Equal)
    });
    ranked
}
