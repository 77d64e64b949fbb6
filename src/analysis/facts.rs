//! Model-backed fact extraction from a single source.

use std::sync::Arc;

use lodestar_search::SourceCandidate;
use lodestar_search::content::truncate_chars;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::depth::Depth;
use crate::llm::{CompletionOptions, Decoded, LanguageModel, decode};

/// Sources with less text than this are not sent to the model.
pub const MIN_EXTRACTABLE_CHARS: usize = 50;
/// Characters of source text included in the prompt.
pub const PROMPT_CONTENT_CHARS: usize = 2000;

/// A factual statement attributed to one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub statement: String,
    /// Clamped to `[0, 1]`.
    pub confidence: f64,
    pub source_url: String,
    pub source_title: String,
    #[serde(default)]
    pub context_snippet: String,
    /// Index of the fact group this fact was placed in.
    #[serde(default)]
    pub group_id: Option<usize>,
}

/// Identity of the source an extraction came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMeta {
    pub url: String,
    pub title: String,
    pub quality_score: f64,
    pub relevance_score: f64,
}

impl From<&SourceCandidate> for SourceMeta {
    fn from(source: &SourceCandidate) -> Self {
        Self {
            url: source.url.clone(),
            title: source.title.clone(),
            quality_score: source.quality_score.unwrap_or(0.0),
            relevance_score: source.relevance(),
        }
    }
}

/// The model's judgement of a source's reliability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceAuthority {
    #[serde(default)]
    pub appears_authoritative: bool,
    #[serde(default)]
    pub reasoning: String,
}

/// Facts and main points extracted from one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub source: SourceMeta,
    pub facts: Vec<Fact>,
    pub main_points: Vec<String>,
    #[serde(default)]
    pub authority: Option<SourceAuthority>,
}

#[derive(Debug, Deserialize)]
struct RawExtraction {
    #[serde(default, alias = "key_information")]
    facts: Vec<RawFact>,
    #[serde(default)]
    main_points: Vec<String>,
    #[serde(default)]
    source_authority: Option<SourceAuthority>,
}

#[derive(Debug, Deserialize)]
struct RawFact {
    #[serde(default, alias = "statement")]
    fact: String,
    #[serde(default = "default_confidence")]
    confidence: f64,
    #[serde(default)]
    context: String,
}

fn default_confidence() -> f64 {
    0.5
}

/// Turn a decoded model response into an extraction attributed to `source`.
///
/// Empty statements are dropped and confidences clamped. Malformed output
/// yields an extraction with no facts.
pub fn parse_extraction(raw: &str, source: &SourceMeta) -> Extraction {
    let parsed = match decode::<RawExtraction>(raw) {
        Decoded::Parsed(parsed) => parsed,
        Decoded::Malformed(reason) => {
            warn!(url = %source.url, %reason, "malformed extraction response");
            RawExtraction {
                facts: Vec::new(),
                main_points: Vec::new(),
                source_authority: None,
            }
        }
    };

    let facts = parsed
        .facts
        .into_iter()
        .filter(|f| !f.fact.trim().is_empty())
        .map(|f| Fact {
            statement: f.fact.trim().to_owned(),
            confidence: clamp_unit(f.confidence),
            source_url: source.url.clone(),
            source_title: source.title.clone(),
            context_snippet: f.context,
            group_id: None,
        })
        .collect();

    Extraction {
        source: source.clone(),
        facts,
        main_points: parsed
            .main_points
            .into_iter()
            .map(|p| p.trim().to_owned())
            .filter(|p| !p.is_empty())
            .collect(),
        authority: parsed.source_authority,
    }
}

/// Clamp to `[0, 1]`, mapping NaN to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

/// Extracts facts from source text with a language model.
pub struct FactExtractor {
    model: Arc<dyn LanguageModel>,
    options: CompletionOptions,
}

impl FactExtractor {
    pub fn new(model: Arc<dyn LanguageModel>, options: CompletionOptions) -> Self {
        Self { model, options }
    }

    /// Extract facts relevant to `question` from `source`.
    ///
    /// Returns `None` when the source is too short, the request fails or
    /// no facts come back.
    pub async fn extract(&self, source: &SourceCandidate, question: &str, depth: Depth) -> Option<Extraction> {
        if source.content_len() < MIN_EXTRACTABLE_CHARS {
            debug!(url = %source.url, "content too short to extract");
            return None;
        }

        let meta = SourceMeta::from(source);
        let prompt = extraction_prompt(&source.raw_content, question, &meta, depth);
        let raw = match self.model.complete(&prompt, &self.options).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(url = %source.url, error = %e, "extraction request failed");
                return None;
            }
        };

        let extraction = parse_extraction(&raw, &meta);
        if extraction.facts.is_empty() {
            return None;
        }
        Some(extraction)
    }
}

fn extraction_prompt(content: &str, question: &str, source: &SourceMeta, depth: Depth) -> String {
    let excerpt = truncate_chars(content, PROMPT_CONTENT_CHARS);
    format!(
        "Extract key facts from the content below that answer the sub-question.\n\n\
SUB-QUESTION: \"{question}\"\n\
READER LEVEL: {depth}\n\
SOURCE URL: {url}\n\n\
CONTENT:\n{excerpt}\n\n\
Only extract specific, factual statements directly relevant to the sub-question and \
suited to a {depth} reader. Respond with JSON only:\n\
{{\"facts\": [{{\"fact\": \"statement\", \"confidence\": 0.9, \"context\": \"surrounding context\"}}], \
\"main_points\": [\"point\"], \
\"source_authority\": {{\"appears_authoritative\": true, \"reasoning\": \"why\"}}}}",
        url = source.url,
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::error::Result;
    use async_trait::async_trait;
    use lodestar_search::SearchResult;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn meta() -> SourceMeta {
        SourceMeta {
            url: "https://example.org/a".into(),
            title: "Example".into(),
            quality_score: 0.8,
            relevance_score: 0.6,
        }
    }

    #[test]
    fn parses_and_attributes_facts() {
        let raw = r#"```json
        {"key_information": [
            {"fact": " Rust has no garbage collector ", "confidence": 1.4, "context": "memory"},
            {"fact": "", "confidence": 0.9},
            {"fact": "Ownership is checked at compile time"}
        ],
        "main_points": ["Memory safety", "  "]}
        ```"#;
        let extraction = parse_extraction(raw, &meta());
        assert_eq!(extraction.facts.len(), 2);
        let first = &extraction.facts[0];
        assert_eq!(first.statement, "Rust has no garbage collector");
        assert_eq!(first.confidence, 1.0);
        assert_eq!(first.source_url, "https://example.org/a");
        assert_eq!(first.source_title, "Example");
        assert_eq!(extraction.facts[1].confidence, 0.5);
        assert_eq!(extraction.main_points, ["Memory safety"]);
    }

    #[test]
    fn malformed_response_gives_no_facts() {
        let extraction = parse_extraction("The page is about cooking.", &meta());
        assert!(extraction.facts.is_empty());
        assert!(extraction.main_points.is_empty());
    }

    #[test]
    fn clamp_handles_nan_and_negatives() {
        assert_eq!(clamp_unit(f64::NAN), 0.0);
        assert_eq!(clamp_unit(-0.2), 0.0);
        assert_eq!(clamp_unit(0.42), 0.42);
    }

    struct CountingModel(AtomicUsize);

    #[async_trait]
    impl LanguageModel for CountingModel {
        fn name(&self) -> &str {
            "counting"
        }

        async fn complete(&self, _prompt: &str, _options: &CompletionOptions) -> Result<String> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(r#"{"facts": [{"fact": "A fact", "confidence": 0.7}]}"#.into())
        }
    }

    fn source(content: &str) -> SourceCandidate {
        SourceCandidate::from_result(SearchResult {
            title: "T".into(),
            url: "https://t.io".into(),
            snippet: String::new(),
            position: 1,
        })
        .with_content(content.into())
    }

    #[tokio::test]
    async fn short_content_skips_the_model() {
        let model = Arc::new(CountingModel(AtomicUsize::new(0)));
        let extractor = FactExtractor::new(model.clone(), CompletionOptions::default());
        let out = extractor.extract(&source("too short"), "q", Depth::Beginner).await;
        assert!(out.is_none());
        assert_eq!(model.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn long_content_is_extracted() {
        let model = Arc::new(CountingModel(AtomicUsize::new(0)));
        let extractor = FactExtractor::new(model.clone(), CompletionOptions::default());
        let out = extractor
            .extract(&source(&"lorem ipsum ".repeat(10)), "q", Depth::Expert)
            .await
            .unwrap();
        assert_eq!(out.facts[0].statement, "A fact");
        assert_eq!(model.0.load(Ordering::SeqCst), 1);
    }
}
