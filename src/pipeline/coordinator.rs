//! Research pipeline that runs the four stages in order.
//!
//! plan → retrieve → analyze → write. Each stage hands an immutable output
//! value to the next. A stage that errors is recorded as a
//! [`StageFailure`], replaced by its default output, and the run carries
//! on, so [`ResearchPipeline::run`] always produces an outcome.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use lodestar_search::{HttpFetcher, PageFetcher, SearchBackend, SerperBackend, SourceGatherer};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::analysis::{AnalysisOutput, Analyst};
use crate::config::ResearchConfig;
use crate::depth::Depth;
use crate::error::{ResearchError, Result};
use crate::llm::{LanguageModel, OpenAiCompatibleClient, OpenAiConfig};
use crate::pipeline::messages::{
    PlanOutput, ResearchOutcome, ResearchSummary, RetrievalOutput, RunStatus, Stage, StageFailure,
    StageTiming,
};
use crate::planner::Planner;
use crate::progress::{ProgressCallback, ProgressEvent};
use crate::report::{ReportOutput, ReportWriter, SavedReport, save_report};

/// Drives a research run from topic to report.
pub struct ResearchPipeline<B, F> {
    planner: Planner,
    gatherer: SourceGatherer<B, F>,
    analyst: Analyst,
    writer: ReportWriter,
    output_dir: Option<PathBuf>,
    progress: Option<ProgressCallback>,
}

impl ResearchPipeline<SerperBackend, HttpFetcher> {
    /// Pipeline backed by an OpenAI-compatible model and the Serper API.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid, a credential cannot be
    /// resolved or an HTTP client cannot be built.
    pub fn from_config(config: &ResearchConfig) -> Result<Self> {
        config.validate()?;
        let client = OpenAiCompatibleClient::new(OpenAiConfig::from_llm_config(&config.llm)?)?;
        let gatherer = SourceGatherer::from_config(config.search.to_search_config()?)?;
        Ok(Self::new(Arc::new(client), gatherer, config))
    }
}

impl<B: SearchBackend, F: PageFetcher> ResearchPipeline<B, F> {
    pub fn new(model: Arc<dyn LanguageModel>, gatherer: SourceGatherer<B, F>, config: &ResearchConfig) -> Self {
        let options = config.llm.completion_options();
        Self {
            planner: Planner::new(Arc::clone(&model), options),
            analyst: Analyst::new(Arc::clone(&model), options, &config.analysis),
            writer: ReportWriter::new(model, options),
            gatherer,
            output_dir: Some(config.output.directory.clone()),
            progress: None,
        }
    }

    /// Directory reports are saved to; `None` keeps them in memory only.
    pub fn with_output_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.output_dir = dir;
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(callback) = &self.progress {
            callback(event);
        }
    }

    /// Decompose the topic into sub-questions.
    ///
    /// # Errors
    ///
    /// Returns [`ResearchError::Pipeline`] for a blank topic.
    pub async fn plan(&self, topic: &str, depth: Depth) -> Result<PlanOutput> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ResearchError::Pipeline("research topic is empty".to_owned()));
        }
        let sub_questions = self.planner.decompose(topic, depth).await;
        self.emit(ProgressEvent::QuestionsPlanned {
            questions: sub_questions.clone(),
        });
        Ok(PlanOutput { sub_questions })
    }

    /// Gather ranked sources for every planned sub-question.
    ///
    /// # Errors
    ///
    /// Returns [`ResearchError::Pipeline`] when there is nothing to search
    /// for or no sub-question produced a single source.
    pub async fn retrieve(&self, plan: &PlanOutput, depth: Depth) -> Result<RetrievalOutput> {
        if plan.sub_questions.is_empty() {
            return Err(ResearchError::Pipeline("no sub-questions to research".to_owned()));
        }
        let limits = depth.profile().gather_limits();
        let output = RetrievalOutput {
            gathered: self.gatherer.gather_all(&plan.sub_questions, limits).await,
        };

        let sources = output.total_sources();
        self.emit(ProgressEvent::SourcesGathered {
            sources,
            empty_questions: output.empty_questions(),
        });
        if sources == 0 {
            return Err(ResearchError::Pipeline(
                "no sources found for any sub-question".to_owned(),
            ));
        }
        Ok(output)
    }

    pub async fn analyze(&self, retrieval: &RetrievalOutput, depth: Depth) -> AnalysisOutput {
        self.analyst.analyze(&retrieval.gathered, depth).await
    }

    pub async fn write(
        &self,
        topic: &str,
        depth: Depth,
        analysis: &AnalysisOutput,
        generated_at: DateTime<Utc>,
    ) -> ReportOutput {
        self.writer.write(topic.trim(), depth, analysis, generated_at).await
    }

    /// Save the report when an output directory is set.
    ///
    /// # Errors
    ///
    /// Returns an error if a report file cannot be written.
    pub fn save(&self, report: &ReportOutput) -> Result<Option<SavedReport>> {
        match &self.output_dir {
            Some(dir) => save_report(dir, report).map(Some),
            None => Ok(None),
        }
    }

    /// Run every stage for `topic`. Never fails; stage errors are listed
    /// in the outcome.
    pub async fn run(&self, topic: &str, depth: Depth) -> ResearchOutcome {
        let run_id = Uuid::new_v4();
        info!(%run_id, %depth, "research run started");
        let mut timings = Vec::with_capacity(4);
        let mut failures = Vec::new();

        let plan = self
            .stage(Stage::Plan, &mut timings, &mut failures, self.plan(topic, depth))
            .await;
        // Planned questions reach analysis even without sources, so each
        // still gets a placeholder answer.
        let retrieval = self
            .stage_or(
                Stage::Retrieve,
                &mut timings,
                &mut failures,
                self.retrieve(&plan, depth),
                |e| RetrievalOutput::unanswered(&plan.sub_questions, &e.to_string()),
            )
            .await;
        let analysis = self
            .stage(Stage::Analyze, &mut timings, &mut failures, async {
                Ok(self.analyze(&retrieval, depth).await)
            })
            .await;

        self.begin(Stage::Write);
        let started = Instant::now();
        let report = self.write(topic, depth, &analysis, Utc::now()).await;
        let saved = match self.save(&report) {
            Ok(saved) => saved,
            Err(e) => {
                self.fail(Stage::Write, &e, &mut failures);
                None
            }
        };
        self.finish(Stage::Write, started, &mut timings);

        let status = if failures.is_empty() {
            RunStatus::Completed
        } else {
            RunStatus::CompletedWithErrors
        };
        let summary = ResearchSummary {
            topic: topic.trim().to_owned(),
            depth,
            sub_questions: plan.sub_questions.len(),
            sources_collected: retrieval.total_sources(),
            status,
        };
        info!(
            %run_id,
            sub_questions = summary.sub_questions,
            sources = summary.sources_collected,
            failures = failures.len(),
            "research run finished"
        );

        ResearchOutcome {
            run_id,
            plan,
            retrieval,
            analysis,
            report,
            saved,
            failures,
            timings,
            summary,
        }
    }

    async fn stage<T: Default>(
        &self,
        stage: Stage,
        timings: &mut Vec<StageTiming>,
        failures: &mut Vec<StageFailure>,
        work: impl Future<Output = Result<T>>,
    ) -> T {
        self.stage_or(stage, timings, failures, work, |_| T::default()).await
    }

    async fn stage_or<T>(
        &self,
        stage: Stage,
        timings: &mut Vec<StageTiming>,
        failures: &mut Vec<StageFailure>,
        work: impl Future<Output = Result<T>>,
        fallback: impl FnOnce(&ResearchError) -> T,
    ) -> T {
        self.begin(stage);
        let started = Instant::now();
        let output = match work.await {
            Ok(output) => output,
            Err(e) => {
                self.fail(stage, &e, failures);
                fallback(&e)
            }
        };
        self.finish(stage, started, timings);
        output
    }

    fn begin(&self, stage: Stage) {
        info!(%stage, "stage started");
        self.emit(ProgressEvent::StageStarted { stage });
    }

    fn finish(&self, stage: Stage, started: Instant, timings: &mut Vec<StageTiming>) {
        let duration = started.elapsed();
        debug!(%stage, elapsed_ms = duration.as_millis() as u64, "stage finished");
        timings.push(StageTiming { stage, duration });
        self.emit(ProgressEvent::StageCompleted {
            stage,
            duration_secs: duration.as_secs_f64(),
        });
    }

    fn fail(&self, stage: Stage, error: &ResearchError, failures: &mut Vec<StageFailure>) {
        warn!(%stage, %error, "stage failed, continuing with default output");
        let message = error.to_string();
        self.emit(ProgressEvent::StageFailed {
            stage,
            message: message.clone(),
        });
        failures.push(StageFailure { stage, message });
    }
}
