//! Machine-readable companion to the Markdown report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::citations::CitationMap;
use crate::analysis::{AnswerSet, OverallInsights};

/// Findings listed in the structured report.
pub const MAX_FINDINGS: usize = 10;
/// Evidence URLs listed per finding.
pub const MAX_EVIDENCE: usize = 3;
const MAX_SUMMARY_POINTS: usize = 5;
const MAX_TITLE_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredReport {
    pub topic: String,
    pub generated_at: DateTime<Utc>,
    pub key_insights: Vec<String>,
    pub overall_assessment: String,
    pub findings: Vec<Finding>,
    pub sources: Vec<SourceRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub title: String,
    pub confidence: f64,
    pub evidence: Vec<String>,
    /// The sub-question the finding answers.
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub index: usize,
    pub title: String,
    pub url: String,
    pub date_accessed: String,
}

impl StructuredReport {
    /// Findings come from the answers' key points, in answer order. Each
    /// finding cites the first source URLs of its answer.
    pub fn build(
        topic: &str,
        answers: &AnswerSet,
        insights: &OverallInsights,
        citations: &CitationMap,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let findings = answers
            .iter()
            .flat_map(|(question, answer)| {
                answer.key_points.iter().map(move |point| Finding {
                    title: point.point.chars().take(MAX_TITLE_CHARS).collect(),
                    confidence: point.confidence,
                    evidence: answer.source_urls.iter().take(MAX_EVIDENCE).cloned().collect(),
                    context: question.to_owned(),
                })
            })
            .take(MAX_FINDINGS)
            .collect();

        let accessed = generated_at.format("%Y-%m-%d").to_string();
        let sources = citations
            .iter()
            .map(|entry| SourceRecord {
                index: entry.index,
                title: entry.title.clone(),
                url: entry.url.clone(),
                date_accessed: accessed.clone(),
            })
            .collect();

        let overall_assessment = if insights.knowledge_synthesis.is_empty() {
            "Research completed successfully".to_owned()
        } else {
            insights.knowledge_synthesis.clone()
        };

        Self {
            topic: topic.to_owned(),
            generated_at,
            key_insights: insights.key_insights.iter().take(MAX_SUMMARY_POINTS).cloned().collect(),
            overall_assessment,
            findings,
            sources,
        }
    }
}
