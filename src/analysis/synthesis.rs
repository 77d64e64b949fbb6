//! Cross-source answer synthesis for one sub-question.

use std::sync::Arc;

use lodestar_search::content::truncate_chars;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::facts::{Extraction, Fact, clamp_unit};
use crate::depth::Depth;
use crate::llm::{CompletionOptions, Decoded, LanguageModel, decode};

/// Characters of serialized facts included in the prompt.
pub const PROMPT_FACTS_CHARS: usize = 3000;
/// Confidence assigned to a fallback answer.
pub const FALLBACK_CONFIDENCE: f64 = 0.6;
/// Number of statements joined into a fallback answer.
const FALLBACK_STATEMENTS: usize = 3;

/// One point of an answer with the sources that back it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPoint {
    pub point: String,
    #[serde(default)]
    pub supporting_sources: Vec<String>,
    #[serde(default)]
    pub confidence: f64,
}

/// How far the sources agree, as judged by the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConsensus {
    pub high_agreement: Vec<String>,
    pub some_disagreement: Vec<String>,
    pub unique_insights: Vec<String>,
}

/// The answer to one sub-question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedAnswer {
    pub question: String,
    pub answer_text: String,
    pub supporting_facts: Vec<Fact>,
    pub confidence_score: f64,
    pub completeness_score: f64,
    pub key_points: Vec<KeyPoint>,
    /// Ordered and free of duplicates.
    pub source_urls: Vec<String>,
    #[serde(default)]
    pub source_consensus: SourceConsensus,
    /// Set when the answer was assembled without the model.
    #[serde(default)]
    pub fallback: bool,
}

impl SynthesizedAnswer {
    /// Placeholder for a question no source could answer.
    pub fn insufficient(question: &str) -> Self {
        Self {
            question: question.to_owned(),
            answer_text: format!("No sufficient information found to answer: {question}"),
            supporting_facts: Vec::new(),
            confidence_score: 0.0,
            completeness_score: 0.0,
            key_points: Vec::new(),
            source_urls: Vec::new(),
            source_consensus: SourceConsensus::default(),
            fallback: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSynthesis {
    #[serde(default, alias = "synthesized_answer")]
    answer: String,
    #[serde(default)]
    key_points: Vec<KeyPoint>,
    #[serde(default)]
    source_consensus: SourceConsensus,
    #[serde(default, alias = "overall_confidence")]
    confidence: f64,
    #[serde(default, alias = "information_completeness")]
    completeness: f64,
}

/// URLs of the extractions in order, duplicates removed.
pub fn extraction_urls(extractions: &[Extraction]) -> Vec<String> {
    let mut urls: Vec<String> = Vec::with_capacity(extractions.len());
    for extraction in extractions {
        let url = &extraction.source.url;
        if !url.is_empty() && !urls.contains(url) {
            urls.push(url.clone());
        }
    }
    urls
}

/// Build an answer from the highest-confidence facts without the model.
///
/// Facts are ordered by confidence, ties keeping their input order, and the
/// top three statements are joined with `". "`.
pub fn fallback_synthesis(question: &str, facts: &[Fact], source_urls: Vec<String>) -> SynthesizedAnswer {
    if facts.is_empty() {
        return SynthesizedAnswer::insufficient(question);
    }

    let mut ranked: Vec<&Fact> = facts.iter().collect();
    ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let answer_text = ranked
        .iter()
        .take(FALLBACK_STATEMENTS)
        .map(|f| f.statement.as_str())
        .collect::<Vec<_>>()
        .join(". ");

    SynthesizedAnswer {
        question: question.to_owned(),
        answer_text,
        supporting_facts: facts.to_vec(),
        confidence_score: FALLBACK_CONFIDENCE,
        completeness_score: 0.0,
        key_points: Vec::new(),
        source_urls,
        source_consensus: SourceConsensus::default(),
        fallback: true,
    }
}

/// Combines the facts of several extractions into one answer.
pub struct Synthesizer {
    model: Arc<dyn LanguageModel>,
    options: CompletionOptions,
}

impl Synthesizer {
    pub fn new(model: Arc<dyn LanguageModel>, options: CompletionOptions) -> Self {
        Self { model, options }
    }

    /// Answer `question` from `facts`, which came from `extractions`.
    ///
    /// `facts` are expected in extraction order. Never fails: any problem
    /// with the model falls back to [`fallback_synthesis`].
    pub async fn synthesize(
        &self,
        question: &str,
        extractions: &[Extraction],
        facts: &[Fact],
        depth: Depth,
    ) -> SynthesizedAnswer {
        if extractions.is_empty() {
            return SynthesizedAnswer::insufficient(question);
        }
        let source_urls = extraction_urls(extractions);

        let prompt = synthesis_prompt(question, facts, extractions.len(), depth);
        let raw = match self.model.complete(&prompt, &self.options).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "synthesis request failed, using fallback");
                return fallback_synthesis(question, facts, source_urls);
            }
        };

        let parsed = match decode::<RawSynthesis>(&raw) {
            Decoded::Parsed(parsed) => parsed,
            Decoded::Malformed(reason) => {
                warn!(%reason, "malformed synthesis response, using fallback");
                return fallback_synthesis(question, facts, source_urls);
            }
        };
        if parsed.answer.trim().is_empty() {
            warn!("empty synthesized answer, using fallback");
            return fallback_synthesis(question, facts, source_urls);
        }

        debug!(key_points = parsed.key_points.len(), "synthesized answer");
        SynthesizedAnswer {
            question: question.to_owned(),
            answer_text: parsed.answer.trim().to_owned(),
            supporting_facts: facts.to_vec(),
            confidence_score: clamp_unit(parsed.confidence),
            completeness_score: clamp_unit(parsed.completeness),
            key_points: parsed
                .key_points
                .into_iter()
                .filter(|k| !k.point.trim().is_empty())
                .map(|k| KeyPoint {
                    confidence: clamp_unit(k.confidence),
                    ..k
                })
                .collect(),
            source_urls,
            source_consensus: parsed.source_consensus,
            fallback: false,
        }
    }
}

#[derive(Serialize)]
struct PromptFact<'a> {
    fact: &'a str,
    confidence: f64,
    source_url: &'a str,
}

fn synthesis_prompt(question: &str, facts: &[Fact], source_count: usize, depth: Depth) -> String {
    let listed: Vec<PromptFact<'_>> = facts
        .iter()
        .map(|f| PromptFact {
            fact: &f.statement,
            confidence: f.confidence,
            source_url: &f.source_url,
        })
        .collect();
    let json = serde_json::to_string_pretty(&listed).unwrap_or_default();
    let facts_json = truncate_chars(&json, PROMPT_FACTS_CHARS);

    format!(
        "Synthesize the facts below into one answer to the sub-question.\n\n\
SUB-QUESTION: \"{question}\"\n\
READER LEVEL: {depth}\n\
SOURCES ANALYZED: {source_count}\n\n\
FACTS:\n{facts_json}\n\n\
Combine complementary facts, prefer the highest-confidence ones, resolve \
contradictions and pitch the answer at a {depth} reader. Respond with JSON only:\n\
{{\"synthesized_answer\": \"answer\", \
\"key_points\": [{{\"point\": \"point\", \"supporting_sources\": [\"url\"], \"confidence\": 0.9}}], \
\"source_consensus\": {{\"high_agreement\": [], \"some_disagreement\": [], \"unique_insights\": []}}, \
\"overall_confidence\": 0.8, \"information_completeness\": 0.8}}"
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::analysis::facts::SourceMeta;
    use crate::error::{ResearchError, Result};
    use async_trait::async_trait;

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

    fn extraction(url: &str, facts: Vec<Fact>) -> Extraction {
        Extraction {
            source: SourceMeta {
                url: url.into(),
                title: "T".into(),
                quality_score: 0.5,
                relevance_score: 0.5,
            },
            facts,
            main_points: Vec::new(),
            authority: None,
        }
    }

    #[test]
    fn fallback_takes_top_three_by_confidence() {
        let facts = vec![
            fact("A", 0.5, "https://a.io"),
            fact("B", 0.9, "https://a.io"),
            fact("C", 0.7, "https://b.io"),
            fact("D", 0.7, "https://b.io"),
            fact("E", 0.95, "https://b.io"),
        ];
        let answer = fallback_synthesis("q", &facts, vec!["https://a.io".into(), "https://b.io".into()]);
        assert_eq!(answer.answer_text, "E. B. C");
        assert_eq!(answer.confidence_score, 0.6);
        assert_eq!(answer.source_urls, ["https://a.io", "https://b.io"]);
        assert!(answer.fallback);
    }

    #[test]
    fn fallback_without_facts_is_a_placeholder() {
        let answer = fallback_synthesis("Why?", &[], Vec::new());
        assert_eq!(answer.answer_text, "No sufficient information found to answer: Why?");
        assert_eq!(answer.confidence_score, 0.0);
        assert!(answer.source_urls.is_empty());
    }

    #[test]
    fn extraction_urls_are_an_ordered_set() {
        let extractions = vec![
            extraction("https://b.io", Vec::new()),
            extraction("https://a.io", Vec::new()),
            extraction("https://b.io", Vec::new()),
        ];
        assert_eq!(extraction_urls(&extractions), ["https://b.io", "https://a.io"]);
    }

    struct Canned(std::result::Result<&'static str, &'static str>);

    #[async_trait]
    impl LanguageModel for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, _prompt: &str, _options: &CompletionOptions) -> Result<String> {
            self.0
                .map(str::to_owned)
                .map_err(|e| ResearchError::Llm(e.to_owned()))
        }
    }

    fn synthesizer(reply: std::result::Result<&'static str, &'static str>) -> Synthesizer {
        Synthesizer::new(Arc::new(Canned(reply)), CompletionOptions::default())
    }

    #[tokio::test]
    async fn no_extractions_gives_placeholder() {
        let answer = synthesizer(Ok("{}")).synthesize("What is X?", &[], &[], Depth::Beginner).await;
        assert_eq!(answer.answer_text, "No sufficient information found to answer: What is X?");
        assert_eq!(answer.confidence_score, 0.0);
        assert!(answer.source_urls.is_empty());
    }

    #[tokio::test]
    async fn model_answer_is_clamped() {
        let facts = vec![fact("X causes Y", 0.9, "https://a.io")];
        let extractions = vec![extraction("https://a.io", facts.clone())];
        let reply = r#"{"synthesized_answer": "X causes Y.", "overall_confidence": 1.7,
            "information_completeness": 0.8,
            "key_points": [{"point": "Causality", "supporting_sources": ["https://a.io"], "confidence": -1}]}"#;
        let answer = synthesizer(Ok(reply))
            .synthesize("Does X cause Y?", &extractions, &facts, Depth::Expert)
            .await;
        assert_eq!(answer.answer_text, "X causes Y.");
        assert_eq!(answer.confidence_score, 1.0);
        assert_eq!(answer.completeness_score, 0.8);
        assert_eq!(answer.key_points[0].confidence, 0.0);
        assert_eq!(answer.source_urls, ["https://a.io"]);
        assert!(!answer.fallback);
    }

    #[tokio::test]
    async fn transport_error_falls_back() {
        let facts = vec![fact("First", 0.4, "https://a.io"), fact("Second", 0.8, "https://a.io")];
        let extractions = vec![extraction("https://a.io", facts.clone())];
        let answer = synthesizer(Err("boom"))
            .synthesize("q", &extractions, &facts, Depth::Intermediate)
            .await;
        assert_eq!(answer.answer_text, "Second. First");
        assert_eq!(answer.confidence_score, 0.6);
    }

    #[tokio::test]
    async fn empty_answer_falls_back() {
        let facts = vec![fact("Only fact", 0.8, "https://a.io")];
        let extractions = vec![extraction("https://a.io", facts.clone())];
        let answer = synthesizer(Ok(r#"{"synthesized_answer": "   "}"#))
            .synthesize("q", &extractions, &facts, Depth::Intermediate)
            .await;
        assert_eq!(answer.answer_text, "Only fact");
        assert!(answer.fallback);
    }
}
