//! Query shaping for the search API.

/// Queries longer than this many words are shortened.
const MAX_QUERY_WORDS: usize = 15;

/// Word count kept when a query is shortened.
const SHORTENED_QUERY_WORDS: usize = 10;

/// Suffix for the broadened query used when direct hits are scarce.
const EXPANSION_SUFFIX: &str = "guide tutorial";

/// Variants tried, in order, when a sub-question still lacks sources.
pub const DEEPER_VARIANTS: &[&str] = &[
    "comprehensive guide",
    "detailed analysis",
    "research study",
    "implementation examples",
];

/// Clean a query before it is sent to the search API.
///
/// Strips quotes and parentheses, and keeps only the first ten words of
/// queries longer than fifteen words.
pub fn sanitize_query(query: &str) -> String {
    let stripped: String = query
        .chars()
        .filter(|c| !matches!(c, '"' | '(' | ')'))
        .collect();

    let words: Vec<&str> = stripped.split_whitespace().collect();
    if words.len() > MAX_QUERY_WORDS {
        words[..SHORTENED_QUERY_WORDS].join(" ")
    } else {
        words.join(" ")
    }
}

/// The broadened form of a query.
pub fn expanded_query(query: &str) -> String {
    format!("{query} {EXPANSION_SUFFIX}")
}

/// The deeper-search form of a query for one variant.
pub fn deeper_query(query: &str, variant: &str) -> String {
    format!("{query} {variant}")
}
