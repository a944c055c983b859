//! Cache-first retrieval pipeline.
//!
//! Explicit application state tying the pieces together: a caller asks for
//! (query, country) → the cache is consulted first → on miss or expiry the
//! resolver walks the fallback chain → the first non-empty result is written
//! back to the cache and returned. Retrieval logic never touches shared
//! globals; rendering is a pure consumer of the returned outcome.
//!
//! # Stale-response guard
//!
//! Every search takes a ticket from the [`RequestSequencer`]. A result whose
//! ticket has been superseded (the caller issued a newer search while this
//! one was in flight) is returned but not applied: it is not written to the
//! cache and is flagged `stale` so display layers can discard it.

use crate::cache::CacheStore;
use crate::models::{QueryKey, RetrievalResult};
use crate::resolver::{RequestSequencer, Resolver};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// What a single search produced, and how.
#[derive(Debug)]
pub struct SearchOutcome {
    pub result: RetrievalResult,
    /// Result was served from the cache without touching any source.
    pub from_cache: bool,
    /// Result arrived after a newer search superseded it; not applied.
    pub stale: bool,
}

/// The retrieval pipeline: resolver + cache manager + request sequencing.
pub struct Pipeline {
    resolver: Resolver,
    cache: CacheStore,
    sequencer: Arc<RequestSequencer>,
}

impl Pipeline {
    pub fn new(resolver: Resolver, cache: CacheStore) -> Self {
        Self {
            resolver,
            cache,
            sequencer: Arc::new(RequestSequencer::new()),
        }
    }

    /// Run one search through cache and fallback chain.
    ///
    /// Records the search in history, serves a live cache entry when
    /// `use_cache` allows, and writes fresh successes back into the cache.
    #[instrument(level = "info", skip(self))]
    pub async fn search(
        &mut self,
        query: &str,
        country: Option<&str>,
        use_cache: bool,
    ) -> SearchOutcome {
        let key = QueryKey::new(query, country);
        self.cache.record_history(query, country);

        if use_cache {
            if let Some(entry) = self.cache.get(&key) {
                info!(
                    source = %entry.source_label,
                    count = entry.articles.len(),
                    "Serving cached result"
                );
                return SearchOutcome {
                    result: RetrievalResult::Success {
                        articles: entry.articles.clone(),
                        source_label: entry.source_label.clone(),
                    },
                    from_cache: true,
                    stale: false,
                };
            }
            debug!("Cache miss");
        }

        let ticket = self.sequencer.issue();
        let result = self
            .resolver
            .resolve(&key.query, key.country_filter())
            .await;

        if !self.sequencer.is_current(ticket) {
            warn!(ticket, "Search superseded while in flight; discarding result");
            return SearchOutcome {
                result,
                from_cache: false,
                stale: true,
            };
        }

        if let RetrievalResult::Success {
            ref articles,
            ref source_label,
        } = result
        {
            self.cache.put(key, articles.clone(), source_label);
        }

        SearchOutcome {
            result,
            from_cache: false,
            stale: false,
        }
    }

    /// Persist cache and history state.
    pub async fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.cache.save().await
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Handle to the sequencer, for callers that cancel on their own
    /// schedule: issuing a ticket supersedes any in-flight search.
    pub fn sequencer(&self) -> Arc<RequestSequencer> {
        Arc::clone(&self.sequencer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::models::{Article, EmptyReason, GLOBAL_COUNTRY};
    use crate::sources::NewsSource;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSource {
        calls: Arc<AtomicUsize>,
        articles: usize,
    }

    #[async_trait]
    impl NewsSource for CountingSource {
        fn label(&self) -> String {
            "counting".to_string()
        }

        async fn fetch(
            &self,
            _query: &str,
            _country: Option<&str>,
        ) -> Result<Vec<Article>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.articles == 0 {
                return Err(FetchError::Transport("down".into()));
            }
            Ok((0..self.articles)
                .map(|i| Article {
                    title: format!("Article {i}"),
                    url: format!("https://example.com/{i}"),
                    source: "example.com".to_string(),
                    published_at: Utc::now(),
                    country: GLOBAL_COUNTRY.to_string(),
                    summary: String::new(),
                    image: None,
                    themes: vec![],
                })
                .collect())
        }
    }

    fn pipeline(articles: usize, calls: Arc<AtomicUsize>) -> Pipeline {
        let resolver = Resolver::new(vec![Box::new(CountingSource { calls, articles })]);
        let cache = CacheStore::in_memory(Duration::hours(1), 20, 10);
        Pipeline::new(resolver, cache)
    }

    #[tokio::test]
    async fn test_second_search_hits_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut pipeline = pipeline(2, calls.clone());

        let first = pipeline.search("technology", None, true).await;
        assert!(!first.from_cache);
        let second = pipeline.search("Technology ", None, true).await;
        assert!(second.from_cache);
        // Equivalent keys collide; the source was only hit once.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_cache_flag_bypasses_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut pipeline = pipeline(2, calls.clone());

        pipeline.search("technology", None, true).await;
        let fresh = pipeline.search("technology", None, false).await;
        assert!(!fresh.from_cache);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_result_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut pipeline = pipeline(0, calls.clone());

        let outcome = pipeline.search("technology", None, true).await;
        assert_eq!(
            outcome.result,
            RetrievalResult::Empty {
                reason: EmptyReason::NoSourcesReachable
            }
        );
        assert!(pipeline.cache().is_empty());

        // A retry hits the source again instead of a cached failure.
        pipeline.search("technology", None, true).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_history_recorded_for_every_search() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut pipeline = pipeline(1, calls);

        pipeline.search("russia", Some("RU"), true).await;
        pipeline.search("technology", None, true).await;
        pipeline.search("russia", Some("RU"), true).await;

        let history = pipeline.cache().history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].query, "russia");
    }

    /// Issues a newer ticket on the shared sequencer while "in flight",
    /// simulating the user starting a new search before this one resolves.
    struct SupersedingSource {
        sequencer: Arc<crate::resolver::RequestSequencer>,
    }

    #[async_trait]
    impl NewsSource for SupersedingSource {
        fn label(&self) -> String {
            "superseding".to_string()
        }

        async fn fetch(
            &self,
            _query: &str,
            _country: Option<&str>,
        ) -> Result<Vec<Article>, FetchError> {
            self.sequencer.issue();
            Ok(vec![Article {
                title: "Late arrival".to_string(),
                url: "https://example.com/late".to_string(),
                source: "example.com".to_string(),
                published_at: Utc::now(),
                country: GLOBAL_COUNTRY.to_string(),
                summary: String::new(),
                image: None,
                themes: vec![],
            }])
        }
    }

    #[tokio::test]
    async fn test_superseded_search_is_stale_and_not_applied() {
        let cache = CacheStore::in_memory(Duration::hours(1), 20, 10);
        let mut pipeline = Pipeline::new(
            Resolver::new(vec![]),
            cache,
        );
        let source = SupersedingSource {
            sequencer: pipeline.sequencer(),
        };
        pipeline.resolver = Resolver::new(vec![Box::new(source)]);

        let outcome = pipeline.search("technology", None, true).await;
        assert!(outcome.stale);
        assert!(matches!(outcome.result, RetrievalResult::Success { .. }));
        // The stale result was never written back.
        assert!(pipeline.cache().is_empty());
    }
}
