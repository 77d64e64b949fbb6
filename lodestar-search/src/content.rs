//! HTML content extraction: strips boilerplate and returns readable text.
//!
//! Finds the main content area, skips text inside non-content elements
//! (scripts, styles, navigation and the like), drops common navigation
//! phrases and collapses whitespace to single spaces.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use crate::error::{Result, SearchError};
use crate::types::PageContent;

/// Elements whose text never counts as page content.
const BOILERPLATE: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "noscript", "svg", "iframe",
];

/// Candidate content containers, most specific first.
const CONTENT_SELECTORS: &[&str] = &["article", "main", "[role=\"main\"]", "body"];

/// Extract readable text from raw HTML, keeping at most `max_chars` characters.
///
/// # Errors
///
/// Returns [`SearchError::Parse`] if no extractable content is found.
pub fn extract_content(html: &str, url: &str, max_chars: usize) -> Result<PageContent> {
    let document = Html::parse_document(html);

    let title = extract_title(&document);
    let raw_text = extract_main_text(&document);
    let text = collapse_whitespace(&remove_navigation_noise(&raw_text));
    if text.is_empty() {
        return Err(SearchError::Parse("no extractable content found".into()));
    }

    let text = truncate_chars(&text, max_chars);
    let word_count = text.split_whitespace().count();

    Ok(PageContent {
        url: url.to_owned(),
        title,
        text,
        word_count,
    })
}

fn extract_title(document: &Html) -> String {
    for selector_str in ["title", "h1"] {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        if let Some(el) = document.select(&selector).next() {
            let title = collapse_whitespace(&el.text().collect::<String>());
            if !title.is_empty() {
                return title;
            }
        }
    }
    String::new()
}

fn extract_main_text(document: &Html) -> String {
    for selector_str in CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let text = visible_text(element);
            if !text.trim().is_empty() {
                return text;
            }
        }
    }
    String::new()
}

/// Text nodes under `root` that are not inside a boilerplate element.
fn visible_text(root: ElementRef<'_>) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for node in root.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            matches!(ancestor.value(), Node::Element(el) if BOILERPLATE.contains(&el.name()))
        });
        if !hidden {
            parts.push(&**text);
        }
    }
    parts.join(" ")
}

fn noise_pattern() -> Option<&'static Regex> {
    static NOISE: OnceLock<Option<Regex>> = OnceLock::new();
    NOISE
        .get_or_init(|| {
            Regex::new(
                r"(?i)\b(?:cookie policy|privacy policy|terms of service|sign up|log in|subscribe|newsletter)\b",
            )
            .ok()
        })
        .as_ref()
}

/// Remove cookie banners, account prompts and similar navigation phrases.
pub fn remove_navigation_noise(text: &str) -> String {
    match noise_pattern() {
        Some(re) => re.replace_all(text, " ").into_owned(),
        None => text.to_owned(),
    }
}

/// Collapse every whitespace run (newlines included) into one space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keep the first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_owned(),
        None => text.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    const URL: &str = "https://example.com/page";

    #[test]
    fn extracts_title() {
        let html = "<html><head><title> Ownership  Explained </title></head><body>Body text</body></html>";
        let page = extract_content(html, URL, 1000).unwrap();
        assert_eq!(page.title, "Ownership Explained");
        assert_eq!(page.url, URL);
    }

    #[test]
    fn falls_back_to_h1_for_title() {
        let html = "<html><body><h1>Heading Title</h1><p>Words</p></body></html>";
        let page = extract_content(html, URL, 1000).unwrap();
        assert_eq!(page.title, "Heading Title");
    }

    #[test]
    fn prefers_article_and_skips_boilerplate() {
        let html = r#"<html><body>
            <nav>Navigation links</nav>
            <article><p>Borrowing rules</p><script>var x = 1;</script><aside>Related</aside></article>
            <footer>Footer text</footer>
        </body></html>"#;
        let page = extract_content(html, URL, 1000).unwrap();
        assert_eq!(page.text, "Borrowing rules");
    }

    #[test]
    fn nested_boilerplate_inside_body_is_hidden() {
        let html = "<html><body><div><header><p>Site header</p></header><p>Real content</p></div></body></html>";
        let page = extract_content(html, URL, 1000).unwrap();
        assert!(page.text.contains("Real content"));
        assert!(!page.text.contains("Site header"));
    }

    #[test]
    fn navigation_noise_is_removed() {
        let text = remove_navigation_noise("Read our Cookie Policy. Sign up for the Newsletter today");
        let cleaned = collapse_whitespace(&text);
        assert_eq!(cleaned, "Read our . for the today");
    }

    #[test]
    fn noise_removal_respects_word_boundaries() {
        let text = remove_navigation_noise("technology in login flows");
        assert_eq!(text, "technology in login flows");
    }

    #[test]
    fn whitespace_collapses_across_lines() {
        assert_eq!(collapse_whitespace("a\n\n  b\t c  "), "a b c");
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_chars("naïve text", 5), "naïve");
        assert_eq!(truncate_chars("short", 50), "short");
    }

    #[test]
    fn truncates_to_limit_and_counts_words() {
        let body = "word ".repeat(500);
        let html = format!("<html><body><p>{body}</p></body></html>");
        let page = extract_content(&html, URL, 600).unwrap();
        assert_eq!(page.text.chars().count(), 600);
        assert_eq!(page.word_count, 120);
    }

    #[test]
    fn scripts_only_is_parse_error() {
        let html = "<html><body><script>alert(1)</script><style>p{}</style></body></html>";
        let err = extract_content(html, URL, 1000).unwrap_err();
        assert!(matches!(err, SearchError::Parse(_)));
    }
}
