//! Lodestar: automated, citation-backed web research.
//!
//! Given a topic and a depth level, a research run:
//! Planner → Retrieval → Analysis → Report
//!
//! # Architecture
//!
//! The run is a strict sequence of stages, each handing an immutable value
//! to the next:
//! - **Planning**: a language model decomposes the topic into sub-questions
//! - **Retrieval**: web search, concurrent page fetching and relevance
//!   ranking, provided by the `lodestar-search` crate
//! - **Analysis**: source quality filtering, fact extraction, fact grouping,
//!   cross-source validation and answer synthesis
//! - **Report**: Markdown report with inline citations, citation repair and
//!   a JSON sidecar, saved to disk
//!
//! Every model-backed step degrades to a deterministic fallback, so a run
//! always ends with a report.

pub mod analysis;
pub mod config;
pub mod depth;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod planner;
pub mod progress;
pub mod report;

pub use analysis::{AnalysisOutput, AnswerSet, SynthesizedAnswer};
pub use config::ResearchConfig;
pub use depth::Depth;
pub use error::{ResearchError, Result};
pub use llm::{CompletionOptions, LanguageModel, OpenAiCompatibleClient};
pub use pipeline::coordinator::ResearchPipeline;
pub use pipeline::messages::{ResearchOutcome, Stage, StageFailure};
pub use progress::{ProgressCallback, ProgressEvent};
pub use report::ReportOutput;
