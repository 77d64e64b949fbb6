//! Progress events for research runs.
//!
//! Provides callback-based progress reporting that decouples the pipeline
//! from presentation (the CLI prints them; tests record them).

use crate::pipeline::messages::Stage;

/// Progress events emitted while a research run advances.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A stage has started.
    StageStarted {
        stage: Stage,
    },

    /// The planner produced the sub-questions.
    QuestionsPlanned {
        questions: Vec<String>,
    },

    /// Sources were gathered for every sub-question.
    SourcesGathered {
        /// Total sources across all sub-questions.
        sources: usize,
        /// Sub-questions that ended up with no sources.
        empty_questions: usize,
    },

    /// A stage finished, successfully or not.
    StageCompleted {
        stage: Stage,
        /// Time taken in seconds.
        duration_secs: f64,
    },

    /// A stage failed; the run continues with its default output.
    StageFailed {
        stage: Stage,
        /// Human-readable error description.
        message: String,
    },
}

/// Callback type for receiving progress events.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;
