//! Values passed between pipeline stages and the run outcome.

use std::fmt;
use std::time::Duration;

use lodestar_search::QuestionSources;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::AnalysisOutput;
use crate::depth::Depth;
use crate::report::{ReportOutput, SavedReport};

/// The four sequential stages of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Plan,
    Retrieve,
    Analyze,
    Write,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Retrieve => "retrieve",
            Self::Analyze => "analyze",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the planning stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanOutput {
    pub sub_questions: Vec<String>,
}

/// Output of the retrieval stage, one entry per sub-question in plan order.
#[derive(Debug, Clone, Default)]
pub struct RetrievalOutput {
    pub gathered: Vec<QuestionSources>,
}

impl RetrievalOutput {
    /// Every question with no sources, each noting why.
    pub fn unanswered(questions: &[String], reason: &str) -> Self {
        Self {
            gathered: questions
                .iter()
                .map(|question| QuestionSources {
                    question: question.clone(),
                    sources: Vec::new(),
                    error: Some(reason.to_owned()),
                })
                .collect(),
        }
    }

    pub fn total_sources(&self) -> usize {
        self.gathered.iter().map(|q| q.sources.len()).sum()
    }

    pub fn empty_questions(&self) -> usize {
        self.gathered.iter().filter(|q| q.sources.is_empty()).count()
    }
}

/// A stage that errored. The run continued with the stage's default output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: Stage,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    CompletedWithErrors,
}

/// Headline numbers for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchSummary {
    pub topic: String,
    pub depth: Depth,
    pub sub_questions: usize,
    pub sources_collected: usize,
    pub status: RunStatus,
}

/// Everything a research run produced.
#[derive(Debug, Clone)]
pub struct ResearchOutcome {
    pub run_id: Uuid,
    pub plan: PlanOutput,
    pub retrieval: RetrievalOutput,
    pub analysis: AnalysisOutput,
    pub report: ReportOutput,
    /// Set when the report was written to disk.
    pub saved: Option<SavedReport>,
    pub failures: Vec<StageFailure>,
    pub timings: Vec<StageTiming>,
    pub summary: ResearchSummary,
}

impl ResearchOutcome {
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names() {
        assert_eq!(Stage::Retrieve.to_string(), "retrieve");
        assert_eq!(serde_json::to_string(&Stage::Analyze).ok().as_deref(), Some("\"analyze\""));
    }

    #[test]
    fn retrieval_totals() {
        let retrieval = RetrievalOutput {
            gathered: vec![
                QuestionSources {
                    question: "a".into(),
                    sources: Vec::new(),
                    error: Some("down".into()),
                },
                QuestionSources {
                    question: "b".into(),
                    sources: Vec::new(),
                    error: None,
                },
            ],
        };
        assert_eq!(retrieval.total_sources(), 0);
        assert_eq!(retrieval.empty_questions(), 2);
    }
}
