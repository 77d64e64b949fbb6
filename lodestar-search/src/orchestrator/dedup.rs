//! Order-preserving deduplication of sources by URL.

use std::collections::HashSet;

use crate::types::SourceCandidate;

/// Remove repeated URLs, keeping the first occurrence of each.
///
/// The key is the lowercased URL string with no further normalisation.
/// Candidates with an empty URL are dropped. Applying this twice gives
/// the same result as applying it once.
pub fn dedupe(sources: Vec<SourceCandidate>) -> Vec<SourceCandidate> {
    let mut seen = HashSet::with_capacity(sources.len());
    sources
        .into_iter()
        .filter(|source| {
            let key = source.url.to_lowercase();
            !key.is_empty() && seen.insert(key)
        })
        .collect()
}

/// Keep only candidates whose URL is not already in `existing`.
pub fn exclude_known(
    existing: &[SourceCandidate],
    fresh: Vec<SourceCandidate>,
) -> Vec<SourceCandidate> {
    let known: HashSet<String> = existing.iter().map(|s| s.url.to_lowercase()).collect();
    dedupe(fresh)
        .into_iter()
        .filter(|s| !known.contains(&s.url.to_lowercase()))
        .collect()
}
