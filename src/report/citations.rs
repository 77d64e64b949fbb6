//! Citation map assembly and citation repair.
//!
//! Reports cite sources inline as `[Title](URL)`. Models sometimes fall
//! back to numbered citations (`[1]`, `[2, 3]`); those are rewritten from
//! the [`CitationMap`] built over the answer set.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use url::Url;

use super::compiled;
use crate::analysis::AnswerSet;

/// Titles used for well-known hosts.
const KNOWN_DOMAINS: &[(&str, &str)] = &[
    ("arxiv.org", "ArXiv Research Paper"),
    ("github.com", "GitHub Repository"),
    ("stackoverflow.com", "Stack Overflow Discussion"),
    ("medium.com", "Medium Article"),
    ("towardsdatascience.com", "Towards Data Science"),
    ("pytorch.org", "PyTorch Documentation"),
    ("tensorflow.org", "TensorFlow Documentation"),
    ("wikipedia.org", "Wikipedia"),
    ("nature.com", "Nature Journal"),
    ("sciencedirect.com", "ScienceDirect Paper"),
];

/// One citable source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationEntry {
    /// 1-based, in first-seen order.
    pub index: usize,
    pub title: String,
    pub url: String,
    /// The sub-question the source was first cited for.
    pub question_context: String,
}

/// Sources numbered in the order they were first seen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CitationMap {
    entries: Vec<CitationEntry>,
}

impl CitationMap {
    /// Add `url` under the next free index and return its index. A URL that
    /// is already present keeps its first index and title.
    pub fn push(&mut self, title: &str, url: &str, question_context: &str) -> usize {
        if let Some(existing) = self.by_url(url) {
            return existing.index;
        }
        let index = self.entries.len() + 1;
        self.entries.push(CitationEntry {
            index,
            title: title.to_owned(),
            url: url.to_owned(),
            question_context: question_context.to_owned(),
        });
        index
    }

    pub fn get(&self, index: usize) -> Option<&CitationEntry> {
        index.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    pub fn by_url(&self, url: &str) -> Option<&CitationEntry> {
        self.entries.iter().find(|e| e.url == url)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CitationEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Number every source URL of `answers`.
///
/// Answers are visited in insertion order, URLs in each answer's order. The
/// title is the page title of a supporting fact from that URL if there is
/// one, else derived from the URL.
pub fn assemble_citations(answers: &AnswerSet) -> CitationMap {
    let mut map = CitationMap::default();
    for (question, answer) in answers.iter() {
        for url in &answer.source_urls {
            if map.by_url(url).is_some() {
                continue;
            }
            let title = answer
                .supporting_facts
                .iter()
                .find(|f| &f.source_url == url && !f.source_title.trim().is_empty())
                .map(|f| f.source_title.trim().to_owned())
                .unwrap_or_else(|| title_from_url(url));
            map.push(&title, url, question);
        }
    }
    map
}

/// Readable title for a URL when no page title is known.
///
/// `www.` is dropped from the host; known hosts map to fixed titles, others
/// become the host minus `.com`/`.org`/`.edu` in title case. Returns
/// `"Source"` when no host can be found.
pub fn title_from_url(url: &str) -> String {
    let parsed = Url::parse(url).or_else(|_| Url::parse(&format!("https://{url}")));
    let Some(host) = parsed.ok().and_then(|u| u.host_str().map(str::to_owned)) else {
        return "Source".to_owned();
    };
    let host = host.replace("www.", "");

    if let Some((_, title)) = KNOWN_DOMAINS.iter().find(|(domain, _)| host.contains(domain)) {
        return (*title).to_owned();
    }

    let bare = host.replace(".com", "").replace(".org", "").replace(".edu", "");
    title_case(&bare)
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

fn numbered_pattern() -> Option<&'static Regex> {
    static NUMBERED: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&NUMBERED, r"\[(\d+(?:\s*,\s*\d+)*)\]")
}

pub(crate) fn inline_link_pattern() -> Option<&'static Regex> {
    static INLINE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&INLINE, r"\[([^\]]+)\]\(([^)]+)\)")
}

/// Rewrite `[n]` and `[n, m, ...]` as inline `[Title](URL)` links.
///
/// Indices missing from `map` are skipped; a bracket with no resolvable
/// index stays as written. Brackets directly followed by `(` are already
/// link text and are left alone.
pub fn repair_numbered_citations(text: &str, map: &CitationMap) -> String {
    let Some(re) = numbered_pattern() else {
        return text.to_owned();
    };
    if map.is_empty() {
        return text.to_owned();
    }

    re.replace_all(text, |caps: &Captures<'_>| {
        let whole = &caps[0];
        let end = caps.get(0).map_or(0, |m| m.end());
        if text[end..].starts_with('(') {
            return whole.to_owned();
        }
        let links: Vec<String> = caps[1]
            .split(',')
            .filter_map(|n| n.trim().parse::<usize>().ok())
            .filter_map(|n| map.get(n))
            .map(|entry| format!("[{}]({})", entry.title, entry.url))
            .collect();
        if links.is_empty() {
            whole.to_owned()
        } else {
            links.join(" ")
        }
    })
    .into_owned()
}

/// Trim title and URL of every `[Title](URL)` and add `https://` to URLs
/// that look like bare hosts.
pub fn normalize_citation_urls(text: &str) -> String {
    let Some(re) = inline_link_pattern() else {
        return text.to_owned();
    };
    re.replace_all(text, |caps: &Captures<'_>| {
        let title = caps[1].trim();
        let url = caps[2].trim();
        let has_scheme = url.starts_with("http://") || url.starts_with("https://");
        if !has_scheme && (url.starts_with("www.") || url.contains('.')) {
            format!("[{title}](https://{url})")
        } else {
            format!("[{title}]({url})")
        }
    })
    .into_owned()
}

/// Numbered-citation rewrite followed by URL normalisation.
pub fn repair_citations(text: &str, map: &CitationMap) -> String {
    normalize_citation_urls(&repair_numbered_citations(text, map))
}

/// Number of inline `[Title](URL)` links in `text`.
pub fn count_inline_citations(text: &str) -> usize {
    inline_link_pattern().map_or(0, |re| re.find_iter(text).count())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::analysis::{Fact, SynthesizedAnswer};

    fn paper_map() -> CitationMap {
        let mut map = CitationMap::default();
        map.push("Paper", "arxiv.org/x", "What is BERT?");
        map
    }

    #[test]
    fn numbered_citation_becomes_inline_link() {
        let out = repair_citations("BERT is bidirectional [1].", &paper_map());
        assert_eq!(out, "BERT is bidirectional [Paper](https://arxiv.org/x).");
    }

    #[test]
    fn unresolvable_index_is_left_verbatim() {
        let text = "See the appendix [9].";
        assert_eq!(repair_numbered_citations(text, &paper_map()), text);
        assert_eq!(repair_citations(text, &paper_map()), text);
    }

    #[test]
    fn lists_resolve_what_they_can() {
        let mut map = paper_map();
        map.push("Docs", "https://docs.rs/x", "q");
        let out = repair_numbered_citations("Claim [1, 7, 2].", &map);
        assert_eq!(out, "Claim [Paper](arxiv.org/x) [Docs](https://docs.rs/x).");
    }

    #[test]
    fn existing_links_are_untouched() {
        let text = "A [1](https://one.io) link.";
        assert_eq!(repair_numbered_citations(text, &paper_map()), text);
    }

    #[test]
    fn normalizes_link_parts() {
        let out = normalize_citation_urls("[ Guide ]( www.rust-lang.org ) and [Local](notes) [Ok](http://a.io)");
        assert_eq!(
            out,
            "[Guide](https://www.rust-lang.org) and [Local](notes) [Ok](http://a.io)"
        );
    }

    #[test]
    fn titles_from_urls() {
        assert_eq!(title_from_url("https://arxiv.org/abs/1810.04805"), "ArXiv Research Paper");
        assert_eq!(title_from_url("https://en.wikipedia.org/wiki/BERT"), "Wikipedia");
        assert_eq!(title_from_url("https://www.rust-lang.org/learn"), "Rust-Lang");
        assert_eq!(title_from_url("https://mit.edu/papers"), "Mit");
        assert_eq!(title_from_url("docs.rs/tokio"), "Docs.Rs");
        assert_eq!(title_from_url(""), "Source");
    }

    fn answer(question: &str, urls: &[&str], titled: Option<(&str, &str)>) -> SynthesizedAnswer {
        let supporting_facts = titled
            .map(|(url, title)| Fact {
                statement: "s".into(),
                confidence: 0.8,
                source_url: url.into(),
                source_title: title.into(),
                context_snippet: String::new(),
                group_id: Some(0),
            })
            .into_iter()
            .collect();
        SynthesizedAnswer {
            answer_text: "a".into(),
            supporting_facts,
            source_urls: urls.iter().map(|u| u.to_string()).collect(),
            ..SynthesizedAnswer::insufficient(question)
        }
    }

    #[test]
    fn citations_follow_answer_then_url_order() {
        let mut answers = AnswerSet::default();
        answers.insert(answer(
            "q1",
            &["https://b.io/x", "https://arxiv.org/1"],
            Some(("https://b.io/x", "Borrowing Explained")),
        ));
        answers.insert(answer("q2", &["https://arxiv.org/1", "https://c.org/y"], None));

        let map = assemble_citations(&answers);
        let listed: Vec<(usize, &str, &str, &str)> = map
            .iter()
            .map(|e| (e.index, e.title.as_str(), e.url.as_str(), e.question_context.as_str()))
            .collect();
        assert_eq!(
            listed,
            [
                (1, "Borrowing Explained", "https://b.io/x", "q1"),
                (2, "ArXiv Research Paper", "https://arxiv.org/1", "q1"),
                (3, "C", "https://c.org/y", "q2"),
            ]
        );
        assert_eq!(map.get(0), None);
        assert_eq!(map.get(3).unwrap().url, "https://c.org/y");
    }

    #[test]
    fn counts_inline_links() {
        assert_eq!(count_inline_citations("[a](https://a.io) text [b](b.io) [c]"), 2);
    }
}
