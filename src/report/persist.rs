//! Writing reports to disk.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::info;

use super::{ReportOutput, compiled};
use crate::error::Result;

const MAX_SLUG_CHARS: usize = 30;

/// Where a report was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedReport {
    pub markdown: PathBuf,
    pub json: Option<PathBuf>,
}

fn non_word() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, r"[^\w\s-]")
}

fn separators() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, r"[-\s]+")
}

/// File-name fragment for a topic: punctuation removed, whitespace and
/// dashes folded to `_`, at most 30 characters.
pub fn topic_slug(topic: &str) -> String {
    let stripped = match non_word() {
        Some(re) => re.replace_all(topic, "").into_owned(),
        None => topic.to_owned(),
    };
    let joined = match separators() {
        Some(re) => re.replace_all(&stripped, "_").into_owned(),
        None => stripped,
    };
    joined.chars().take(MAX_SLUG_CHARS).collect()
}

/// Markdown path for a report on `topic` generated at `generated_at`.
pub fn report_path(dir: &Path, topic: &str, generated_at: DateTime<Utc>) -> PathBuf {
    dir.join(format!(
        "research_report_{}_{}.md",
        topic_slug(topic),
        generated_at.format("%Y%m%d_%H%M%S")
    ))
}

/// Write the Markdown report and, when present, its JSON sidecar into `dir`.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or a file cannot be
/// written.
pub fn save_report(dir: &Path, report: &ReportOutput) -> Result<SavedReport> {
    std::fs::create_dir_all(dir)?;

    let markdown = report_path(dir, &report.metadata.topic, report.metadata.generated_at);
    std::fs::write(&markdown, &report.markdown)?;

    let json = match &report.structured {
        Some(structured) => {
            let path = markdown.with_extension("json");
            std::fs::write(&path, serde_json::to_string_pretty(structured)?)?;
            Some(path)
        }
        None => None,
    };

    info!(path = %markdown.display(), "report saved");
    Ok(SavedReport { markdown, json })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use chrono::TimeZone;

    #[test]
    fn slugs() {
        assert_eq!(topic_slug("Rust async: a - guide!"), "Rust_async_a_guide");
        assert_eq!(topic_slug("BERT vs. GPT"), "BERT_vs_GPT");
        assert_eq!(topic_slug(&"word ".repeat(20)).chars().count(), 30);
    }

    #[test]
    fn path_carries_slug_and_timestamp() {
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 8, 5, 9).single().unwrap();
        let path = report_path(Path::new("out"), "Memory safety", at);
        assert_eq!(path, Path::new("out/research_report_Memory_safety_20261016_080509.md"));
    }
}
