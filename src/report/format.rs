//! Final clean-up of generated Markdown and report statistics.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::citations::{CitationMap, count_inline_citations, repair_citations};
use super::compiled;
use crate::depth::Depth;

/// Identifies generated reports in their front matter.
pub const GENERATOR: &str = "Lodestar research pipeline";

fn source_list_line() -> Option<&'static Regex> {
    static LINE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&LINE, r"\n\s*\*\s*\[\d+\][^\n]*")
}

fn header_start() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, r"\n(#{1,6})")
}

fn header_end() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, r"(#{1,6}.*?)\n([^\n#])")
}

fn list_item() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, r"\n(\s*[-*+])")
}

fn blank_run() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, r"\n{3,}")
}

fn section_header() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, r"(?m)^#+")
}

fn replace(re: Option<&Regex>, text: &str, with: &str) -> String {
    match re {
        Some(re) => re.replace_all(text, with).into_owned(),
        None => text.to_owned(),
    }
}

/// Drop numbered source-list lines such as `* [3] Some title - url`.
pub fn remove_numbered_source_lines(text: &str) -> String {
    replace(source_list_line(), text, "")
}

/// Blank lines around headers and before list items, at most one blank
/// line in a row, outer whitespace trimmed.
pub fn fix_markdown_spacing(text: &str) -> String {
    let text = replace(header_start(), text, "\n\n$1");
    let text = replace(header_end(), &text, "$1\n\n$2");
    let text = replace(list_item(), &text, "\n\n$1");
    let text = replace(blank_run(), &text, "\n\n");
    text.trim().to_owned()
}

/// Front matter placed at the top of every report.
pub fn front_matter(generated_at: DateTime<Utc>, format: &str) -> String {
    format!(
        "---\nGenerated: {}\nGenerator: {GENERATOR}\nFormat: {format}\n---\n\n",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    )
}

/// Repair citations, clean up Markdown and prepend the front matter.
pub fn validate_and_format(report: &str, citations: &CitationMap, generated_at: DateTime<Utc>) -> String {
    let repaired = repair_citations(report, citations);
    let cleaned = remove_numbered_source_lines(&repaired);
    let spaced = fix_markdown_spacing(&cleaned);
    format!("{}{spaced}", front_matter(generated_at, "Evidence-Backed Research Report"))
}

/// Statistics describing a finished report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    pub topic: String,
    pub depth: Depth,
    pub word_count: usize,
    pub citation_count: usize,
    pub section_count: usize,
    pub sources_analyzed: usize,
    pub sub_questions_covered: usize,
    /// `min(citation_count * 0.1, 1.0)`.
    pub quality_score: f64,
    pub fallback: bool,
}

impl ReportMetadata {
    pub fn measure(
        markdown: &str,
        topic: &str,
        depth: Depth,
        sources_analyzed: usize,
        sub_questions_covered: usize,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let citation_count = count_inline_citations(markdown);
        Self {
            generated_at,
            topic: topic.to_owned(),
            depth,
            word_count: markdown.split_whitespace().count(),
            citation_count,
            section_count: section_header().map_or(0, |re| re.find_iter(markdown).count()),
            sources_analyzed,
            sub_questions_covered,
            quality_score: (citation_count as f64 * 0.1).min(1.0),
            fallback: false,
        }
    }
}
