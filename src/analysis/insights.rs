//! Topic-wide insights and coverage gaps across all answers.

use serde::{Deserialize, Serialize};
use tracing::warn;

use lodestar_search::content::truncate_chars;

use super::AnswerSet;
use crate::depth::Depth;
use crate::llm::{CompletionOptions, Decoded, LanguageModel, decode};

/// Answers below this confidence are flagged as low-confidence areas.
pub const LOW_CONFIDENCE: f64 = 0.6;
/// Answers below this completeness are flagged as incomplete.
pub const INCOMPLETE: f64 = 0.7;

const PROMPT_ANSWERS_CHARS: usize = 3000;

/// Themes connecting the individual answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallInsights {
    #[serde(default)]
    pub key_insights: Vec<String>,
    /// Theme name to the questions it spans, sorted by theme.
    #[serde(default)]
    pub thematic_connections: Vec<(String, Vec<String>)>,
    #[serde(default)]
    pub knowledge_synthesis: String,
}

impl Default for OverallInsights {
    fn default() -> Self {
        Self {
            key_insights: vec!["Analysis completed across multiple sources".to_owned()],
            thematic_connections: Vec::new(),
            knowledge_synthesis: "Information synthesized from multiple sources".to_owned(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawInsights {
    #[serde(default)]
    key_insights: Vec<String>,
    #[serde(default)]
    thematic_connections: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    knowledge_synthesis: String,
}

impl From<RawInsights> for OverallInsights {
    fn from(raw: RawInsights) -> Self {
        let thematic_connections = raw
            .thematic_connections
            .into_iter()
            .map(|(theme, questions)| {
                let questions = match questions {
                    serde_json::Value::Array(items) => items
                        .into_iter()
                        .filter_map(|v| v.as_str().map(str::to_owned))
                        .collect(),
                    serde_json::Value::String(s) => vec![s],
                    _ => Vec::new(),
                };
                (theme, questions)
            })
            .collect();
        Self {
            key_insights: raw
                .key_insights
                .into_iter()
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
                .collect(),
            thematic_connections,
            knowledge_synthesis: raw.knowledge_synthesis.trim().to_owned(),
        }
    }
}

/// Ask the model for insights spanning every answer.
///
/// Falls back to [`OverallInsights::default`] when the model fails or
/// returns nothing usable.
pub async fn overall_insights(
    model: &dyn LanguageModel,
    options: &CompletionOptions,
    answers: &AnswerSet,
    depth: Depth,
) -> OverallInsights {
    if answers.is_empty() {
        return OverallInsights::default();
    }

    let prompt = insights_prompt(answers, depth);
    let raw = match model.complete(&prompt, options).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "insights request failed");
            return OverallInsights::default();
        }
    };
    match decode::<RawInsights>(&raw) {
        Decoded::Parsed(parsed) => {
            let insights = OverallInsights::from(parsed);
            if insights.key_insights.is_empty() && insights.knowledge_synthesis.is_empty() {
                OverallInsights::default()
            } else {
                insights
            }
        }
        Decoded::Malformed(reason) => {
            warn!(%reason, "malformed insights response");
            OverallInsights::default()
        }
    }
}

fn insights_prompt(answers: &AnswerSet, depth: Depth) -> String {
    let map: serde_json::Map<String, serde_json::Value> = answers
        .iter()
        .map(|(q, a)| (q.to_owned(), serde_json::Value::String(a.answer_text.clone())))
        .collect();
    let json = serde_json::to_string_pretty(&map).unwrap_or_default();
    let answers_json = truncate_chars(&json, PROMPT_ANSWERS_CHARS);
    format!(
        "Connect the answers below into overall insights for a {depth} reader.\n\n\
SUB-QUESTION ANSWERS:\n{answers_json}\n\n\
Identify common themes, connections between aspects and overarching insights. \
Respond with JSON only:\n\
{{\"key_insights\": [\"insight\"], \
\"thematic_connections\": {{\"theme\": [\"sub-question\"]}}, \
\"knowledge_synthesis\": \"summary\"}}"
    )
}

/// Questions whose answers are weak.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InformationGaps {
    pub low_confidence_areas: Vec<String>,
    pub incomplete_answers: Vec<String>,
    pub missing_perspectives: Vec<String>,
}

impl InformationGaps {
    pub fn is_empty(&self) -> bool {
        self.low_confidence_areas.is_empty()
            && self.incomplete_answers.is_empty()
            && self.missing_perspectives.is_empty()
    }
}

/// Flag answers below [`LOW_CONFIDENCE`] or [`INCOMPLETE`].
pub fn information_gaps(answers: &AnswerSet) -> InformationGaps {
    let mut gaps = InformationGaps::default();
    for (question, answer) in answers.iter() {
        if answer.confidence_score < LOW_CONFIDENCE {
            gaps.low_confidence_areas.push(question.to_owned());
        }
        if answer.completeness_score < INCOMPLETE {
            gaps.incomplete_answers.push(question.to_owned());
        }
    }
    gaps
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::analysis::synthesis::SynthesizedAnswer;
    use crate::error::{ResearchError, Result};
    use async_trait::async_trait;

    fn answer(question: &str, confidence: f64, completeness: f64) -> SynthesizedAnswer {
        SynthesizedAnswer {
            answer_text: format!("About {question}"),
            confidence_score: confidence,
            completeness_score: completeness,
            fallback: false,
            ..SynthesizedAnswer::insufficient(question)
        }
    }

    fn answers() -> AnswerSet {
        let mut set = AnswerSet::default();
        set.insert(answer("strong", 0.9, 0.9));
        set.insert(answer("shaky", 0.5, 0.9));
        set.insert(answer("partial", 0.8, 0.6));
        set
    }

    #[test]
    fn gaps_use_strict_thresholds() {
        let mut set = answers();
        set.insert(answer("edge", 0.6, 0.7));
        let gaps = information_gaps(&set);
        assert_eq!(gaps.low_confidence_areas, ["shaky"]);
        assert_eq!(gaps.incomplete_answers, ["partial"]);
        assert!(gaps.missing_perspectives.is_empty());
    }

    struct Reply(std::result::Result<&'static str, &'static str>);

    #[async_trait]
    impl LanguageModel for Reply {
        fn name(&self) -> &str {
            "reply"
        }

        async fn complete(&self, _prompt: &str, _options: &CompletionOptions) -> Result<String> {
            self.0
                .map(str::to_owned)
                .map_err(|e| ResearchError::Llm(e.to_owned()))
        }
    }

    #[tokio::test]
    async fn insights_are_parsed() {
        let model = Reply(Ok(
            r#"{"key_insights": ["Safety and speed go together"],
                "thematic_connections": {"performance": ["strong", "partial"]},
                "knowledge_synthesis": "Rust trades compile time for runtime safety."}"#,
        ));
        let insights = overall_insights(&model, &CompletionOptions::default(), &answers(), Depth::Expert).await;
        assert_eq!(insights.key_insights, ["Safety and speed go together"]);
        assert_eq!(
            insights.thematic_connections,
            [("performance".to_owned(), vec!["strong".to_owned(), "partial".to_owned()])]
        );
    }

    #[tokio::test]
    async fn failures_use_fixed_text() {
        let model = Reply(Err("down"));
        let insights = overall_insights(&model, &CompletionOptions::default(), &answers(), Depth::Beginner).await;
        assert_eq!(insights, OverallInsights::default());

        let model = Reply(Ok("no json here"));
        let insights = overall_insights(&model, &CompletionOptions::default(), &answers(), Depth::Beginner).await;
        assert_eq!(insights.knowledge_synthesis, "Information synthesized from multiple sources");
    }
}
