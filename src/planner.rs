//! Topic decomposition into sub-questions.
//!
//! The model proposes sub-questions as JSON; the list is cleaned up and
//! capped by depth. When the model fails or proposes nothing usable a
//! fixed template decomposition is used instead.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::depth::{Depth, DepthProfile};
use crate::llm::{CompletionOptions, Decoded, LanguageModel, decode};

/// Questions this short carry no real intent.
const MIN_QUESTION_CHARS: usize = 10;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PlannerResponse {
    List(Vec<String>),
    Object {
        #[serde(alias = "questions")]
        sub_questions: Vec<String>,
    },
}

impl PlannerResponse {
    fn into_questions(self) -> Vec<String> {
        match self {
            Self::List(questions) | Self::Object { sub_questions: questions } => questions,
        }
    }
}

/// Turns a topic into sub-questions with a language model.
pub struct Planner {
    model: Arc<dyn LanguageModel>,
    options: CompletionOptions,
}

impl Planner {
    pub fn new(model: Arc<dyn LanguageModel>, options: CompletionOptions) -> Self {
        Self { model, options }
    }

    /// Decompose `topic` into sub-questions for `depth`. Never empty.
    pub async fn decompose(&self, topic: &str, depth: Depth) -> Vec<String> {
        let profile = depth.profile();
        let prompt = planning_prompt(topic, depth, &profile);

        let proposed = match self.model.complete(&prompt, &self.options).await {
            Ok(raw) => match decode::<PlannerResponse>(&raw) {
                Decoded::Parsed(response) => response.into_questions(),
                Decoded::Malformed(reason) => {
                    warn!(%reason, "planner returned malformed output");
                    Vec::new()
                }
            },
            Err(e) => {
                warn!(error = %e, "planner request failed");
                Vec::new()
            }
        };

        let questions = finalize_questions(proposed, profile.max_questions);
        if questions.is_empty() {
            debug!("using template decomposition");
            return fallback_questions(topic, depth);
        }
        debug!(count = questions.len(), "sub-questions planned");
        questions
    }
}

fn planning_prompt(topic: &str, depth: Depth, profile: &DepthProfile) -> String {
    format!(
        "You are a research planner. Break the research topic below into {target} focused \
sub-questions (at least {min}, at most {max}) suitable for a {depth} audience. Each \
sub-question must be answerable from web sources and together they must cover \
definitions, mechanisms, applications and limitations.\n\n\
Topic: {topic}\n\n\
Respond with a JSON array of strings and nothing else.",
        target = profile.target_questions,
        min = profile.min_questions,
        max = profile.max_questions,
    )
}

/// Trim, drop trivially short entries, dedupe case-insensitively (first
/// spelling wins) and cap at `max`.
pub fn finalize_questions(questions: Vec<String>, max: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    questions
        .into_iter()
        .map(|q| q.trim().to_owned())
        .filter(|q| q.chars().count() > MIN_QUESTION_CHARS)
        .filter(|q| seen.insert(q.to_lowercase()))
        .take(max)
        .collect()
}

/// Template decomposition used when the model gives nothing usable.
pub fn fallback_questions(topic: &str, depth: Depth) -> Vec<String> {
    let mut questions = vec![
        format!("What is {topic} definition and overview"),
        format!("How does {topic} work"),
        format!("{topic} applications and examples"),
        format!("Benefits and advantages of {topic}"),
        format!("Challenges and limitations of {topic}"),
    ];
    match depth {
        Depth::Expert => {
            questions.push(format!("{topic} technical implementation details"));
            questions.push(format!("{topic} research and latest developments"));
        }
        Depth::Intermediate => {
            questions.push(format!("{topic} best practices and guidelines"));
        }
        Depth::Beginner => {}
    }
    questions.truncate(depth.profile().target_questions);
    questions
}
