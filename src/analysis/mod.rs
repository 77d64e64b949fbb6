//! Analysis stage: turns gathered sources into validated answers.
//!
//! For each sub-question the [`Analyst`] runs, in order:
//!
//! 1. [`quality::filter_sources`]: drop short or off-topic sources
//! 2. [`facts::FactExtractor`]: model-backed fact extraction per source
//! 3. [`grouping::group_facts`]: cluster similar statements
//! 4. [`synthesis::Synthesizer`]: combine facts into one answer
//! 5. [`validation::validate`]: measure cross-source agreement
//!
//! and then derives topic-wide [`insights`] and information gaps.

pub mod facts;
pub mod grouping;
pub mod insights;
pub mod quality;
pub mod synthesis;
pub mod validation;

use std::sync::Arc;

use lodestar_search::QuestionSources;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::AnalysisConfig;
use crate::depth::Depth;
use crate::llm::{CompletionOptions, LanguageModel};

pub use facts::{Extraction, Fact, FactExtractor};
pub use grouping::{FactGroup, GroupingStrategy, group_facts};
pub use insights::{InformationGaps, OverallInsights};
pub use quality::{QualityBreakdown, QualityThresholds, filter_sources};
pub use synthesis::{KeyPoint, SynthesizedAnswer, Synthesizer, fallback_synthesis};
pub use validation::{ValidationReport, ValidationStatus, validate};

/// Answers keyed by sub-question, iterated in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet {
    answers: Vec<SynthesizedAnswer>,
}

impl AnswerSet {
    /// Insert an answer under its question. An answer to a question already
    /// present replaces it in place.
    pub fn insert(&mut self, answer: SynthesizedAnswer) {
        match self.answers.iter_mut().find(|a| a.question == answer.question) {
            Some(existing) => *existing = answer,
            None => self.answers.push(answer),
        }
    }

    pub fn get(&self, question: &str) -> Option<&SynthesizedAnswer> {
        self.answers.iter().find(|a| a.question == question)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SynthesizedAnswer)> {
        self.answers.iter().map(|a| (a.question.as_str(), a))
    }

    pub fn values(&self) -> impl Iterator<Item = &SynthesizedAnswer> {
        self.answers.iter()
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

/// Per-question bookkeeping kept next to the answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAnalysis {
    pub question: String,
    pub total_sources: usize,
    pub quality_sources: usize,
    pub extractions: usize,
    pub quality_breakdown: QualityBreakdown,
    pub validation: ValidationReport,
}

/// Totals over the whole analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub depth: Depth,
    pub total_sources_analyzed: usize,
    pub high_quality_sources: usize,
}

/// Everything the analysis stage produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub answers: AnswerSet,
    pub questions: Vec<QuestionAnalysis>,
    pub insights: OverallInsights,
    pub gaps: InformationGaps,
    pub metadata: AnalysisMetadata,
}

/// Runs the per-question analysis steps.
pub struct Analyst {
    model: Arc<dyn LanguageModel>,
    options: CompletionOptions,
    thresholds: QualityThresholds,
    grouping: GroupingStrategy,
    extractor: FactExtractor,
    synthesizer: Synthesizer,
}

impl Analyst {
    pub fn new(model: Arc<dyn LanguageModel>, options: CompletionOptions, config: &AnalysisConfig) -> Self {
        Self {
            extractor: FactExtractor::new(Arc::clone(&model), options),
            synthesizer: Synthesizer::new(Arc::clone(&model), options),
            model,
            options,
            thresholds: QualityThresholds::from(config),
            grouping: config.grouping,
        }
    }

    /// Analyse every sub-question in order. Never fails; questions without
    /// usable sources get a placeholder answer.
    pub async fn analyze(&self, gathered: &[QuestionSources], depth: Depth) -> AnalysisOutput {
        let mut answers = AnswerSet::default();
        let mut questions = Vec::with_capacity(gathered.len());
        let mut total_sources = 0;

        for entry in gathered {
            let (answer, analysis) = self.analyze_question(entry, depth).await;
            total_sources += analysis.total_sources;
            info!(
                quality_sources = analysis.quality_sources,
                total_sources = analysis.total_sources,
                confidence = answer.confidence_score,
                "analysed sub-question"
            );
            answers.insert(answer);
            questions.push(analysis);
        }

        let insights = insights::overall_insights(self.model.as_ref(), &self.options, &answers, depth).await;
        let gaps = insights::information_gaps(&answers);
        let high_quality_sources = questions.iter().map(|q| q.quality_sources).sum();

        AnalysisOutput {
            answers,
            questions,
            insights,
            gaps,
            metadata: AnalysisMetadata {
                depth,
                total_sources_analyzed: total_sources,
                high_quality_sources,
            },
        }
    }

    async fn analyze_question(&self, entry: &QuestionSources, depth: Depth) -> (SynthesizedAnswer, QuestionAnalysis) {
        let question = entry.question.as_str();
        let kept = filter_sources(entry.sources.clone(), &self.thresholds);
        debug!(kept = kept.len(), of = entry.sources.len(), "quality filter");

        let mut extractions = Vec::with_capacity(kept.len());
        for source in &kept {
            if let Some(extraction) = self.extractor.extract(source, question, depth).await {
                extractions.push(extraction);
            }
        }

        let mut facts: Vec<Fact> = extractions.iter().flat_map(|e| e.facts.iter().cloned()).collect();
        let groups = group_facts(&mut facts, self.grouping);
        debug!(facts = facts.len(), groups = groups.len(), "grouped facts");

        let answer = self.synthesizer.synthesize(question, &extractions, &facts, depth).await;
        let validation = validate(extractions.len(), &groups);

        let analysis = QuestionAnalysis {
            question: question.to_owned(),
            total_sources: entry.sources.len(),
            quality_sources: kept.len(),
            extractions: extractions.len(),
            quality_breakdown: quality::quality_breakdown(&kept),
            validation,
        };
        (answer, analysis)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn answer(question: &str, text: &str) -> SynthesizedAnswer {
        SynthesizedAnswer {
            answer_text: text.into(),
            ..SynthesizedAnswer::insufficient(question)
        }
    }

    #[test]
    fn answer_set_keeps_insertion_order() {
        let mut set = AnswerSet::default();
        set.insert(answer("zeta", "1"));
        set.insert(answer("alpha", "2"));
        set.insert(answer("mid", "3"));
        let order: Vec<&str> = set.iter().map(|(q, _)| q).collect();
        assert_eq!(order, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn reinserting_replaces_in_place() {
        let mut set = AnswerSet::default();
        set.insert(answer("a", "old"));
        set.insert(answer("b", "b"));
        set.insert(answer("a", "new"));
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("a").unwrap().answer_text, "new");
        assert_eq!(set.iter().next().unwrap().0, "a");
    }
}
