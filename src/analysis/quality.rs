//! Source quality scoring and filtering.
//!
//! ```text
//! quality = length term (0.3 if >= 800 chars, 0.2 if >= 400, 0.1 if >= min, else 0)
//!         + min(relevance * 0.4, 0.4)
//!         + 0.2  if extraction succeeded
//!         + 0.05 if the lowercased URL contains "edu", "org" or "gov"
//!         + 0.05 if it contains "https"
//! ```

use std::cmp::Ordering;

use lodestar_search::SourceCandidate;
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;

/// Cut-offs applied before a source is analysed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityThresholds {
    pub min_content_len: usize,
    pub min_relevance: f64,
    pub max_kept: usize,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_content_len: 100,
            min_relevance: 0.3,
            max_kept: 10,
        }
    }
}

impl From<&AnalysisConfig> for QualityThresholds {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            min_content_len: config.min_content_len,
            min_relevance: config.min_relevance,
            max_kept: config.max_sources_per_answer,
        }
    }
}

/// Quality score of a source, in `[0, 1]`.
pub fn quality_score(source: &SourceCandidate, min_content_len: usize) -> f64 {
    let len = source.content_len();
    let mut score = if len >= 800 {
        0.3
    } else if len >= 400 {
        0.2
    } else if len >= min_content_len {
        0.1
    } else {
        0.0
    };

    score += (source.relevance() * 0.4).min(0.4);

    if source.extraction_succeeded {
        score += 0.2;
    }

    let url = source.url.to_lowercase();
    if ["edu", "org", "gov"].iter().any(|marker| url.contains(marker)) {
        score += 0.05;
    }
    if url.contains("https") {
        score += 0.05;
    }

    score
}

/// Score every source, drop those below the thresholds, sort by quality
/// (stable, highest first) and keep at most `max_kept`.
pub fn filter_sources(sources: Vec<SourceCandidate>, thresholds: &QualityThresholds) -> Vec<SourceCandidate> {
    let mut kept: Vec<SourceCandidate> = sources
        .into_iter()
        .map(|source| {
            let score = quality_score(&source, thresholds.min_content_len);
            source.with_quality(score)
        })
        .filter(|source| {
            source.content_len() >= thresholds.min_content_len
                && source.relevance() >= thresholds.min_relevance
        })
        .collect();

    kept.sort_by(|a, b| {
        let qa = a.quality_score.unwrap_or(0.0);
        let qb = b.quality_score.unwrap_or(0.0);
        qb.partial_cmp(&qa).unwrap_or(Ordering::Equal)
    });
    kept.truncate(thresholds.max_kept);
    kept
}

/// Distribution of quality scores over a set of sources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityBreakdown {
    pub average_quality: f64,
    /// Scores of 0.7 and above.
    pub high: usize,
    /// Scores from 0.4 up to 0.7.
    pub medium: usize,
    /// Scores below 0.4.
    pub low: usize,
}

/// Breakdown of the quality scores carried by `sources`. All zero when empty.
pub fn quality_breakdown(sources: &[SourceCandidate]) -> QualityBreakdown {
    if sources.is_empty() {
        return QualityBreakdown::default();
    }
    let scores: Vec<f64> = sources.iter().map(|s| s.quality_score.unwrap_or(0.0)).collect();
    QualityBreakdown {
        average_quality: scores.iter().sum::<f64>() / scores.len() as f64,
        high: scores.iter().filter(|&&s| s >= 0.7).count(),
        medium: scores.iter().filter(|&&s| (0.4..0.7).contains(&s)).count(),
        low: scores.iter().filter(|&&s| s < 0.4).count(),
    }
}
