//! In-memory cache for search API responses.
//!
//! Keyed by (backend name, lowercased trimmed query). Uses [`moka`] for
//! async-friendly caching with TTL eviction. Each gatherer owns its cache,
//! so nothing persists across runs.

use std::time::Duration;

use moka::future::Cache;

use crate::types::SearchResult;

/// Maximum number of cached result sets.
const MAX_CACHE_ENTRIES: u64 = 256;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    backend: &'static str,
    query: String,
}

impl CacheKey {
    fn new(backend: &'static str, query: &str) -> Self {
        Self {
            backend,
            query: query.trim().to_lowercase(),
        }
    }
}

/// Search result cache. A TTL of zero disables it.
#[derive(Clone)]
pub struct SearchCache {
    inner: Option<Cache<CacheKey, Vec<SearchResult>>>,
}

impl SearchCache {
    pub fn new(ttl_seconds: u64) -> Self {
        let inner = (ttl_seconds > 0).then(|| {
            Cache::builder()
                .max_capacity(MAX_CACHE_ENTRIES)
                .time_to_live(Duration::from_secs(ttl_seconds))
                .build()
        });
        Self { inner }
    }

    /// Cached results for `query`, if present and not expired.
    pub async fn get(&self, backend: &'static str, query: &str) -> Option<Vec<SearchResult>> {
        let cache = self.inner.as_ref()?;
        cache.get(&CacheKey::new(backend, query)).await
    }

    pub async fn insert(&self, backend: &'static str, query: &str, results: Vec<SearchResult>) {
        if let Some(cache) = &self.inner {
            cache.insert(CacheKey::new(backend, query), results).await;
        }
    }
}
