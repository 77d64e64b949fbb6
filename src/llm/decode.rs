//! Tolerant decoding of JSON embedded in model output.
//!
//! Models wrap JSON in markdown fences or surround it with prose. The
//! decoder strips fences and parses the span from the first `{` to the
//! last `}`, then the first `[` to the last `]`, then the whole body,
//! keeping the first that parses. It never fails: unusable output becomes
//! [`Decoded::Malformed`] carrying the reason.

use serde::de::DeserializeOwned;

/// Outcome of decoding model output.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<T> {
    Parsed(T),
    Malformed(String),
}

/// Decode `raw` model output as `T`.
pub fn decode<T: DeserializeOwned>(raw: &str) -> Decoded<T> {
    let body = strip_fences(raw);
    if body.is_empty() {
        return Decoded::Malformed("empty response".to_owned());
    }

    // Object first: prose before the JSON may itself contain brackets.
    let spans = [span(body, '{', '}'), span(body, '[', ']')];
    let mut first_error = None;
    for candidate in spans.into_iter().flatten().chain(std::iter::once(body)) {
        match serde_json::from_str::<T>(candidate) {
            Ok(value) => return Decoded::Parsed(value),
            Err(e) => {
                first_error.get_or_insert_with(|| e.to_string());
            }
        }
    }
    Decoded::Malformed(first_error.unwrap_or_default())
}

/// The contents of the first ```` ```json ```` (or bare ```` ``` ````) fence,
/// or the trimmed input when there is none.
fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();

    for fence in ["```json", "```"] {
        if let Some(start) = trimmed.find(fence) {
            let after = &trimmed[start + fence.len()..];
            if let Some(end) = after.find("```") {
                return after[..end].trim();
            }
        }
    }

    trimmed
}

/// From the first `open` to the last `close`.
fn span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}
