//! Report stage: Markdown report with inline citations plus a JSON sidecar.

pub mod citations;
pub mod format;
pub mod persist;
pub mod structured;

use std::fmt::Write as _;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use lodestar_search::content::truncate_chars;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analysis::AnalysisOutput;
use crate::depth::Depth;
use crate::error::{ResearchError, Result};
use crate::llm::{CompletionOptions, LanguageModel};

pub use citations::{
    CitationEntry, CitationMap, assemble_citations, normalize_citation_urls, repair_citations,
    repair_numbered_citations, title_from_url,
};
pub use format::{ReportMetadata, validate_and_format};
pub use persist::{SavedReport, save_report, topic_slug};
pub use structured::StructuredReport;

const PROMPT_ANSWERS_CHARS: usize = 4000;
const PROMPT_INSIGHTS_CHARS: usize = 1500;
const PROMPT_CITATIONS_CHARS: usize = 2000;

pub(crate) fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

/// A finished report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportOutput {
    pub markdown: String,
    /// Absent for fallback reports.
    pub structured: Option<StructuredReport>,
    pub metadata: ReportMetadata,
    pub citations: CitationMap,
}

/// Writes the report from the analysis results.
pub struct ReportWriter {
    model: Arc<dyn LanguageModel>,
    options: CompletionOptions,
}

impl ReportWriter {
    pub fn new(model: Arc<dyn LanguageModel>, options: CompletionOptions) -> Self {
        Self { model, options }
    }

    /// Write the report for `topic`. Falls back to [`fallback_report`] when
    /// the model fails or returns nothing.
    pub async fn write(
        &self,
        topic: &str,
        depth: Depth,
        analysis: &AnalysisOutput,
        generated_at: DateTime<Utc>,
    ) -> ReportOutput {
        let citations = assemble_citations(&analysis.answers);
        match self.generate(topic, depth, analysis, &citations).await {
            Ok(draft) => {
                let markdown = validate_and_format(&draft, &citations, generated_at);
                let metadata = ReportMetadata::measure(
                    &markdown,
                    topic,
                    depth,
                    analysis.metadata.total_sources_analyzed,
                    analysis.answers.len(),
                    generated_at,
                );
                info!(
                    words = metadata.word_count,
                    citations = metadata.citation_count,
                    "report written"
                );
                let structured =
                    StructuredReport::build(topic, &analysis.answers, &analysis.insights, &citations, generated_at);
                ReportOutput {
                    markdown,
                    structured: Some(structured),
                    metadata,
                    citations,
                }
            }
            Err(e) => {
                warn!(error = %e, "report generation failed, writing fallback report");
                fallback_report(topic, depth, analysis, generated_at)
            }
        }
    }

    async fn generate(
        &self,
        topic: &str,
        depth: Depth,
        analysis: &AnalysisOutput,
        citations: &CitationMap,
    ) -> Result<String> {
        let prompt = report_prompt(topic, depth, analysis, citations)?;
        let draft = self.model.complete(&prompt, &self.options).await?;
        let draft = draft.trim();
        if draft.is_empty() {
            return Err(ResearchError::Report("model returned an empty report".to_owned()));
        }
        Ok(draft.to_owned())
    }
}

fn report_prompt(topic: &str, depth: Depth, analysis: &AnalysisOutput, citations: &CitationMap) -> Result<String> {
    let answers: serde_json::Map<String, serde_json::Value> = analysis
        .answers
        .iter()
        .map(|(q, a)| (q.to_owned(), serde_json::Value::String(a.answer_text.clone())))
        .collect();
    let answers = serde_json::to_string_pretty(&answers)?;
    let insights = serde_json::to_string_pretty(&analysis.insights)?;
    let sources = serde_json::to_string_pretty(citations)?;
    let style = depth.profile().style;

    Ok(format!(
        "Write an evidence-backed research report in Markdown.\n\n\
TOPIC: \"{topic}\"\n\
READER LEVEL: {depth}\n\
WRITING STYLE: {explanation}\n\
TECHNICAL TERMS: {terms}\n\
DETAIL LEVEL: {detail}\n\n\
SUB-QUESTION ANSWERS:\n{answers}\n\n\
OVERALL INSIGHTS:\n{insights}\n\n\
SOURCES:\n{sources}\n\n\
Requirements:\n\
1. Every factual statement is followed by an inline citation in the form [Source Title](URL).\n\
2. Do not use numbered citations such as [1].\n\
3. Use Markdown headers, lists and emphasis.\n\
4. Provide {examples}, structured with {structure}.\n\n\
Structure:\n\
# {topic}\n\
## Executive Summary\n\
## Introduction\n\
## Key Findings\n\
## Detailed Analysis\n\
## Insights and Implications\n\
## Conclusion\n\
## Sources",
        answers = truncate_chars(&answers, PROMPT_ANSWERS_CHARS),
        insights = truncate_chars(&insights, PROMPT_INSIGHTS_CHARS),
        sources = truncate_chars(&sources, PROMPT_CITATIONS_CHARS),
        explanation = style.explanation_style,
        terms = style.technical_terms,
        detail = style.detail_level,
        examples = style.examples,
        structure = style.structure,
    ))
}

/// Deterministic report built from the analysis alone, used when the model
/// cannot write one.
pub fn fallback_report(
    topic: &str,
    depth: Depth,
    analysis: &AnalysisOutput,
    generated_at: DateTime<Utc>,
) -> ReportOutput {
    let citations = assemble_citations(&analysis.answers);
    let mut md = format::front_matter(generated_at, "Basic Research Report (fallback)");

    let _ = writeln!(md, "# {topic}\n");
    md.push_str("## Report Generation Notice\n\n");
    md.push_str(
        "The full report could not be generated. The findings below are the \
analysed answers to each sub-question.\n\n",
    );
    let _ = writeln!(md, "- **Reader level**: {depth}");
    let _ = writeln!(md, "- **Sub-questions analysed**: {}", analysis.answers.len());
    let _ = writeln!(
        md,
        "- **Sources analysed**: {}\n",
        analysis.metadata.total_sources_analyzed
    );

    md.push_str("## Findings\n\n");
    for (question, answer) in analysis.answers.iter() {
        let _ = writeln!(md, "### {question}\n");
        let _ = writeln!(md, "{}\n", answer.answer_text);
        let links: Vec<String> = answer
            .source_urls
            .iter()
            .filter_map(|url| citations.by_url(url))
            .map(|entry| format!("[{}]({})", entry.title, entry.url))
            .collect();
        if !links.is_empty() {
            let _ = writeln!(md, "Sources: {}\n", links.join(" "));
        }
    }

    if !citations.is_empty() {
        md.push_str("## Sources\n\n");
        for entry in citations.iter() {
            let _ = writeln!(md, "{}. [{}]({})", entry.index, entry.title, entry.url);
        }
    }

    let markdown = normalize_citation_urls(md.trim_end());
    let mut metadata = ReportMetadata::measure(
        &markdown,
        topic,
        depth,
        analysis.metadata.total_sources_analyzed,
        analysis.answers.len(),
        generated_at,
    );
    metadata.fallback = true;

    ReportOutput {
        markdown,
        structured: None,
        metadata,
        citations,
    }
}
