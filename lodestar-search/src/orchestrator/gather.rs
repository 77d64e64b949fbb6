//! Per-question source gathering.
//!
//! For each sub-question: search (widening the query when hits are
//! scarce), dedupe, fetch every page on a bounded pool with a per-fetch
//! timeout, search deeper if still short of sources, then rank by
//! relevance and truncate. Search calls go through one rate limiter and
//! an in-process cache.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::cache::SearchCache;
use crate::config::SearchConfig;
use crate::engine::{PageFetcher, SearchBackend};
use crate::engines::SerperBackend;
use crate::error::{Result, SearchError};
use crate::fetch::HttpFetcher;
use crate::orchestrator::dedup::{dedupe, exclude_known};
use crate::orchestrator::scoring::rank_by_relevance;
use crate::query::{deeper_query, expanded_query, sanitize_query, DEEPER_VARIANTS};
use crate::rate_limit::RateLimiter;
use crate::types::{SearchResult, SourceCandidate};

/// Hits taken from each deeper-search variant.
const DEEPER_RESULTS_PER_VARIANT: usize = 3;

/// Per-question limits, usually derived from the research depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatherLimits {
    /// Sources kept after ranking.
    pub max_sources: usize,
    /// Characters of page text kept per source.
    pub content_chars: usize,
}

/// Sources gathered for one sub-question.
#[derive(Debug, Clone)]
pub struct QuestionSources {
    pub question: String,
    /// Ranked by relevance, highest first.
    pub sources: Vec<SourceCandidate>,
    /// Set when every search for the question failed.
    pub error: Option<String>,
}

/// Drives search and fetch for sub-questions.
pub struct SourceGatherer<B, F> {
    backend: B,
    fetcher: F,
    config: SearchConfig,
    limiter: RateLimiter,
    cache: SearchCache,
}

impl SourceGatherer<SerperBackend, HttpFetcher> {
    /// Gatherer using the Serper API and the HTTP page fetcher.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] for an invalid config or a missing
    /// API key.
    pub fn from_config(config: SearchConfig) -> Result<Self> {
        config.validate()?;
        let backend = SerperBackend::new(&config)?;
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self::new(backend, fetcher, config))
    }
}

impl<B: SearchBackend, F: PageFetcher> SourceGatherer<B, F> {
    pub fn new(backend: B, fetcher: F, config: SearchConfig) -> Self {
        let limiter = RateLimiter::new(Duration::from_millis(config.min_interval_ms));
        let cache = SearchCache::new(config.cache_ttl_seconds);
        Self {
            backend,
            fetcher,
            config,
            limiter,
            cache,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Sanitized, cached and rate-limited search.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let query = sanitize_query(query);
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let backend = self.backend.name();
        if let Some(hit) = self.cache.get(backend, &query).await {
            tracing::trace!(query = %query, "search cache hit");
            return Ok(hit);
        }

        let results = self.limiter.run(self.backend.search(&query)).await?;
        self.cache.insert(backend, &query, results.clone()).await;
        Ok(results)
    }

    /// Gather, fetch and rank sources for one sub-question.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::AllBackendsFailed`] when every search for the
    /// question failed and nothing was found.
    pub async fn gather(&self, question: &str, limits: GatherLimits) -> Result<Vec<SourceCandidate>> {
        let base_query = sanitize_query(question);
        let mut failures = Vec::new();

        let mut hits = match self.search(&base_query).await {
            Ok(results) => results,
            Err(e) => {
                failures.push(e.to_string());
                Vec::new()
            }
        };

        if hits.len() < self.config.target_sources_per_query {
            match self.search(&expanded_query(&base_query)).await {
                Ok(more) => hits.extend(more),
                Err(e) => failures.push(e.to_string()),
            }
        }

        if hits.is_empty() && !failures.is_empty() {
            return Err(SearchError::AllBackendsFailed(failures.join("; ")));
        }

        let candidates = dedupe(hits.into_iter().map(SourceCandidate::from_result).collect());
        debug!(candidates = candidates.len(), "fetching candidate pages");
        let mut sources = self.fetch_all(candidates, limits.content_chars).await;

        if sources.len() < self.config.min_sources_per_query {
            let needed = self.config.min_sources_per_query - sources.len();
            let extra = self.search_deeper(&base_query, &sources, needed).await;
            if !extra.is_empty() {
                debug!(extra = extra.len(), "deeper search found more candidates");
                let fetched = self.fetch_all(extra, limits.content_chars).await;
                sources.extend(fetched);
            }
        }

        let mut ranked = rank_by_relevance(question, sources);
        ranked.truncate(limits.max_sources);
        Ok(ranked)
    }

    /// Gather sources for each question in turn. Never fails: a question
    /// whose searches all fail gets an empty source list and an error note.
    pub async fn gather_all(&self, questions: &[String], limits: GatherLimits) -> Vec<QuestionSources> {
        let mut gathered = Vec::with_capacity(questions.len());
        for (i, question) in questions.iter().enumerate() {
            info!(index = i + 1, total = questions.len(), "gathering sources");
            let entry = match self.gather(question, limits).await {
                Ok(sources) => {
                    debug!(sources = sources.len(), "sources gathered");
                    QuestionSources {
                        question: question.clone(),
                        sources,
                        error: None,
                    }
                }
                Err(e) => {
                    warn!(error = %e, "no sources for sub-question");
                    QuestionSources {
                        question: question.clone(),
                        sources: Vec::new(),
                        error: Some(e.to_string()),
                    }
                }
            };
            gathered.push(entry);
        }
        gathered
    }

    /// Fetch every candidate on a bounded pool, keeping input order.
    ///
    /// A failed or timed-out fetch degrades the candidate to its snippet.
    async fn fetch_all(&self, candidates: Vec<SourceCandidate>, max_chars: usize) -> Vec<SourceCandidate> {
        let timeout = Duration::from_secs(self.config.fetch_timeout_seconds);
        let concurrency = self.config.fetch_concurrency.max(1);

        let mut fetched: Vec<(usize, SourceCandidate)> = stream::iter(candidates.into_iter().enumerate())
            .map(|(idx, candidate)| async move {
                let outcome =
                    tokio::time::timeout(timeout, self.fetcher.fetch(&candidate.url, max_chars)).await;
                let candidate = match outcome {
                    Ok(Ok(page)) => candidate.with_content(page.text),
                    Ok(Err(e)) => {
                        warn!(url = %candidate.url, error = %e, "fetch failed, using snippet");
                        candidate.degraded(e.to_string())
                    }
                    Err(_) => {
                        warn!(url = %candidate.url, "fetch timed out, using snippet");
                        candidate.degraded(format!("fetch timed out after {}s", timeout.as_secs()))
                    }
                };
                (idx, candidate)
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        fetched.sort_by_key(|(idx, _)| *idx);
        fetched.into_iter().map(|(_, candidate)| candidate).collect()
    }

    /// Search variant queries until `needed` new candidates are found.
    async fn search_deeper(
        &self,
        base_query: &str,
        existing: &[SourceCandidate],
        needed: usize,
    ) -> Vec<SourceCandidate> {
        let mut found: Vec<SourceCandidate> = Vec::new();
        for variant in DEEPER_VARIANTS {
            if found.len() >= needed {
                break;
            }
            let results = match self.search(&deeper_query(base_query, variant)).await {
                Ok(results) => results,
                Err(e) => {
                    warn!(variant, error = %e, "deeper search failed");
                    continue;
                }
            };
            let fresh: Vec<SourceCandidate> = results
                .into_iter()
                .take(DEEPER_RESULTS_PER_VARIANT)
                .map(SourceCandidate::from_result)
                .collect();
            let known: Vec<SourceCandidate> = existing.iter().chain(found.iter()).cloned().collect();
            found.extend(exclude_known(&known, fresh));
        }
        found.truncate(needed);
        found
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::types::PageContent;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingBackend {
        calls: AtomicUsize,
        per_call: usize,
    }

    impl SearchBackend for CountingBackend {
        async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok((0..self.per_call)
                .map(|i| SearchResult {
                    title: format!("{query} result {i}"),
                    url: format!("https://example.com/{}/{i}", query.replace(' ', "-")),
                    snippet: format!("snippet about {query}"),
                    position: i + 1,
                })
                .collect())
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    struct EchoFetcher;

    impl PageFetcher for EchoFetcher {
        async fn fetch(&self, url: &str, max_chars: usize) -> Result<PageContent> {
            if url.ends_with("/1") {
                return Err(SearchError::Http("HTTP 404".into()));
            }
            let text: String = format!("content for {url}").chars().take(max_chars).collect();
            Ok(PageContent {
                url: url.into(),
                title: String::new(),
                word_count: text.split_whitespace().count(),
                text,
            })
        }
    }

    fn config() -> SearchConfig {
        SearchConfig {
            min_interval_ms: 0,
            ..Default::default()
        }
    }

    const LIMITS: GatherLimits = GatherLimits {
        max_sources: 5,
        content_chars: 600,
    };

    #[tokio::test]
    async fn enough_hits_skip_expansion() {
        let backend = CountingBackend {
            calls: AtomicUsize::new(0),
            per_call: 8,
        };
        let gatherer = SourceGatherer::new(backend, EchoFetcher, config());
        let sources = gatherer.gather("rust traits", LIMITS).await.unwrap();
        assert_eq!(sources.len(), 5);
        assert_eq!(gatherer.backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_fetch_degrades_to_snippet() {
        let backend = CountingBackend {
            calls: AtomicUsize::new(0),
            per_call: 8,
        };
        let gatherer = SourceGatherer::new(backend, EchoFetcher, config());
        let sources = gatherer
            .gather(
                "rust traits",
                GatherLimits {
                    max_sources: 10,
                    content_chars: 600,
                },
            )
            .await
            .unwrap();
        let degraded: Vec<_> = sources.iter().filter(|s| !s.extraction_succeeded).collect();
        assert_eq!(degraded.len(), 1);
        assert_eq!(degraded[0].raw_content, "snippet about rust traits");
        assert_eq!(degraded[0].extraction_error.as_deref(), Some("HTTP error: HTTP 404"));
    }

    #[tokio::test]
    async fn repeated_queries_hit_the_cache() {
        let backend = CountingBackend {
            calls: AtomicUsize::new(0),
            per_call: 2,
        };
        let gatherer = SourceGatherer::new(backend, EchoFetcher, config());
        gatherer.search("Tokio").await.unwrap();
        gatherer.search("tokio").await.unwrap();
        assert_eq!(gatherer.backend.calls.load(Ordering::SeqCst), 1);
    }
}
