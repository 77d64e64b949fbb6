//! Cross-source consistency check over fact groups.

use serde::{Deserialize, Serialize};

use super::facts::Fact;
use super::grouping::FactGroup;

/// Consistency reported when there are too few extractions to compare.
pub const INSUFFICIENT_CONSISTENCY: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// Fewer than two extractions, nothing to cross-check.
    #[serde(rename = "insufficient_sources")]
    Insufficient,
    Validated,
}

/// A statement backed by more than one fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusFact {
    pub statement: String,
    /// Number of facts in the group.
    pub supporting_sources: usize,
    pub mean_confidence: f64,
    pub source_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub status: ValidationStatus,
    pub consensus_facts: Vec<ConsensusFact>,
    pub unique_facts: Vec<Fact>,
    /// Share of groups with more than one member, in `[0, 1]`.
    pub consistency_score: f64,
}

impl ValidationReport {
    fn insufficient() -> Self {
        Self {
            status: ValidationStatus::Insufficient,
            consensus_facts: Vec::new(),
            unique_facts: Vec::new(),
            consistency_score: INSUFFICIENT_CONSISTENCY,
        }
    }
}

/// Summarise agreement across `extraction_count` extractions whose facts
/// were grouped into `groups`.
pub fn validate(extraction_count: usize, groups: &[FactGroup]) -> ValidationReport {
    if extraction_count < 2 {
        return ValidationReport::insufficient();
    }

    let mut consensus_facts = Vec::new();
    let mut unique_facts = Vec::new();
    for group in groups {
        let Some(representative) = group.representative() else {
            continue;
        };
        if group.len() > 1 {
            let mut source_urls: Vec<String> = Vec::new();
            for fact in &group.facts {
                if !source_urls.contains(&fact.source_url) {
                    source_urls.push(fact.source_url.clone());
                }
            }
            consensus_facts.push(ConsensusFact {
                statement: representative.statement.clone(),
                supporting_sources: group.len(),
                mean_confidence: group.mean_confidence(),
                source_urls,
            });
        } else {
            unique_facts.push(representative.clone());
        }
    }

    let consistency_score = if groups.is_empty() {
        0.0
    } else {
        consensus_facts.len() as f64 / groups.len() as f64
    };

    ValidationReport {
        status: ValidationStatus::Validated,
        consensus_facts,
        unique_facts,
        consistency_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::grouping::{GroupingStrategy, group_facts};

    fn fact(statement: &str, confidence: f64, url: &str) -> Fact {
        Fact {
            statement: statement.into(),
            confidence,
            source_url: url.into(),
            source_title: String::new(),
            context_snippet: String::new(),
            group_id: None,
        }
    }

    #[test]
    fn fewer_than_two_extractions_is_insufficient() {
        let groups = group_facts(&mut [fact("X causes Y", 0.9, "https://a.io")], GroupingStrategy::Greedy);
        let report = validate(1, &groups);
        assert_eq!(report.status, ValidationStatus::Insufficient);
        assert_eq!(report.consistency_score, 0.5);
        assert_eq!(
            serde_json::to_value(report.status).ok(),
            Some(serde_json::json!("insufficient_sources"))
        );
    }

    #[test]
    fn shared_statement_becomes_consensus() {
        let groups = group_facts(
            &mut [
                fact("X causes Y", 0.9, "https://a.io"),
                fact("X causes Y", 0.8, "https://b.io"),
            ],
            GroupingStrategy::Greedy,
        );
        let report = validate(2, &groups);
        assert_eq!(report.status, ValidationStatus::Validated);
        assert_eq!(report.consensus_facts.len(), 1);
        let consensus = &report.consensus_facts[0];
        assert_eq!(consensus.supporting_sources, 2);
        assert!((consensus.mean_confidence - 0.85).abs() < 1e-12);
        assert_eq!(consensus.source_urls, ["https://a.io", "https://b.io"]);
        assert_eq!(report.consistency_score, 1.0);
    }

    #[test]
    fn consistency_is_share_of_multi_member_groups() {
        let groups = group_facts(
            &mut [
                fact("X causes Y", 0.9, "https://a.io"),
                fact("X causes Y", 0.8, "https://b.io"),
                fact("Completely different claim here", 0.7, "https://a.io"),
                fact("Another separate observation entirely", 0.6, "https://c.io"),
            ],
            GroupingStrategy::Greedy,
        );
        let report = validate(3, &groups);
        assert_eq!(report.unique_facts.len(), 2);
        assert!((report.consistency_score - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn no_groups_scores_zero() {
        let report = validate(3, &[]);
        assert_eq!(report.consistency_score, 0.0);
        assert!(report.consensus_facts.is_empty());
    }
}
