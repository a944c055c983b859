//! Source resolver: the ordered, short-circuiting fallback walk.
//!
//! Given a query and optional country filter, the resolver attempts its
//! configured sources in priority order and stops at the first non-empty,
//! fully-normalized result. Transport and decode failures are recovered
//! locally by advancing; only after every source is exhausted does the
//! caller see a terminal [`RetrievalResult::Empty`], with a reason
//! distinguishing "nothing reachable" from "sources answered, no matches".
//!
//! The walk is linear and unconditional — each later source is only worth
//! trying once the previous one is confirmed unusable, and sequential
//! attempts avoid redundant upstream load. The resolver itself is pure over
//! network responses; caching belongs to the caller.

use crate::config::PipelineConfig;
use crate::models::{Article, EmptyReason, RetrievalResult};
use crate::sources::gdelt::GdeltSource;
use crate::sources::guardian::GuardianSource;
use crate::sources::relay::RelaySource;
use crate::sources::snapshot::{SnapshotKind, SnapshotSource};
use crate::sources::NewsSource;
use itertools::Itertools;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, instrument, warn};

/// Walks a priority-ordered list of sources until one yields articles.
pub struct Resolver {
    sources: Vec<Box<dyn NewsSource>>,
}

impl Resolver {
    /// Build a resolver with an explicit attempt plan.
    pub fn new(sources: Vec<Box<dyn NewsSource>>) -> Self {
        Self { sources }
    }

    /// Build the standard attempt plan from configuration:
    /// GDELT → each relay in order → Guardian (when a key is configured) →
    /// exact snapshot → latest snapshot.
    pub fn from_config(config: &PipelineConfig, client: reqwest::Client) -> Self {
        let mut sources: Vec<Box<dyn NewsSource>> = Vec::new();
        sources.push(Box::new(GdeltSource::new(
            client.clone(),
            &config.gdelt_url,
            config.max_records,
        )));
        for relay in &config.relays {
            sources.push(Box::new(RelaySource::new(
                client.clone(),
                relay,
                &config.gdelt_url,
                config.max_records,
            )));
        }
        if let Some(ref key) = config.guardian_api_key {
            sources.push(Box::new(GuardianSource::new(
                client.clone(),
                &config.guardian_url,
                key,
                config.max_records,
            )));
        }
        sources.push(Box::new(SnapshotSource::new(
            client.clone(),
            &config.snapshot_base_url,
            SnapshotKind::Exact,
        )));
        sources.push(Box::new(SnapshotSource::new(
            client,
            &config.snapshot_base_url,
            SnapshotKind::Latest,
        )));
        Self { sources }
    }

    /// Attempt labels in walk order. Useful for logging the active plan.
    pub fn plan(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.label()).collect()
    }

    /// Resolve a query against the fallback chain.
    ///
    /// Never raises: every per-source failure either advances the walk or is
    /// folded into the terminal empty reason.
    #[instrument(level = "info", skip(self), fields(attempts = self.sources.len()))]
    pub async fn resolve(&self, query: &str, country: Option<&str>) -> RetrievalResult {
        let mut any_reachable = false;

        for source in &self.sources {
            let label = source.label();
            match source.fetch(query, country).await {
                Ok(articles) if !articles.is_empty() => {
                    let articles: Vec<Article> = articles
                        .into_iter()
                        .unique_by(|a| a.url.clone())
                        .collect();
                    info!(source = %label, count = articles.len(), "Resolved articles");
                    return RetrievalResult::Success {
                        articles,
                        source_label: label,
                    };
                }
                Ok(_) => {
                    any_reachable = true;
                    info!(source = %label, "Source reachable but empty; advancing");
                }
                Err(e) => {
                    any_reachable |= e.source_reachable();
                    warn!(source = %label, error = %e, "Source attempt failed; advancing");
                }
            }
        }

        let reason = if any_reachable {
            EmptyReason::NoMatches
        } else {
            EmptyReason::NoSourcesReachable
        };
        info!(?reason, "All sources exhausted");
        RetrievalResult::Empty { reason }
    }
}

/// Monotonic ticket dispenser guarding against stale responses.
///
/// Each retrieval request takes a ticket; a result is only applied while its
/// ticket is still the latest issued, so an abandoned request can never
/// overwrite the state of a newer one.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    next: AtomicU64,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next ticket, superseding all previously issued ones.
    pub fn issue(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether `ticket` is still the latest issued.
    pub fn is_current(&self, ticket: u64) -> bool {
        self.next.load(Ordering::SeqCst) == ticket
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::models::{FALLBACK_TITLE, GLOBAL_COUNTRY};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::AtomicUsize;

    /// Scripted source: returns a fixed outcome and counts calls.
    struct ScriptedSource {
        label: String,
        outcome: fn() -> Result<Vec<Article>, FetchError>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn boxed(label: &str, outcome: fn() -> Result<Vec<Article>, FetchError>) -> Box<Self> {
            Box::new(Self {
                label: label.to_string(),
                outcome,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl NewsSource for ScriptedSource {
        fn label(&self) -> String {
            self.label.clone()
        }

        async fn fetch(
            &self,
            _query: &str,
            _country: Option<&str>,
        ) -> Result<Vec<Article>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }
    }

    fn articles(n: usize) -> Vec<Article> {
        (0..n)
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
            .collect()
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let resolver = Resolver::new(vec![
            ScriptedSource::boxed("first", || Ok(articles(2))),
            ScriptedSource::boxed("second", || panic!("must not be called")),
        ]);
        match resolver.resolve("technology", None).await {
            RetrievalResult::Success {
                articles,
                source_label,
            } => {
                assert_eq!(articles.len(), 2);
                assert_eq!(source_label, "first");
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transport_failure_advances_to_next() {
        let resolver = Resolver::new(vec![
            ScriptedSource::boxed("dead", || Err(FetchError::Transport("timed out".into()))),
            ScriptedSource::boxed("live", || Ok(articles(3))),
        ]);
        match resolver.resolve("technology", None).await {
            RetrievalResult::Success {
                articles,
                source_label,
            } => {
                assert_eq!(articles.len(), 3);
                assert_eq!(source_label, "live");
                for a in &articles {
                    assert!(!a.title.is_empty());
                    assert_ne!(a.title, FALLBACK_TITLE);
                }
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_success_advances() {
        let resolver = Resolver::new(vec![
            ScriptedSource::boxed("empty", || Ok(vec![])),
            ScriptedSource::boxed("live", || Ok(articles(1))),
        ]);
        match resolver.resolve("technology", None).await {
            RetrievalResult::Success { source_label, .. } => assert_eq!(source_label, "live"),
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_all_transport_failures_is_no_sources_reachable() {
        let resolver = Resolver::new(vec![
            ScriptedSource::boxed("a", || Err(FetchError::Transport("refused".into()))),
            ScriptedSource::boxed("b", || Err(FetchError::Decode("garbage".into()))),
        ]);
        assert_eq!(
            resolver.resolve("zzz-nonexistent", None).await,
            RetrievalResult::Empty {
                reason: EmptyReason::NoSourcesReachable
            }
        );
    }

    #[tokio::test]
    async fn test_reachable_but_empty_is_no_matches() {
        let resolver = Resolver::new(vec![
            ScriptedSource::boxed("dead", || Err(FetchError::Transport("refused".into()))),
            ScriptedSource::boxed("empty", || Ok(vec![])),
        ]);
        assert_eq!(
            resolver.resolve("zzz-nonexistent", None).await,
            RetrievalResult::Empty {
                reason: EmptyReason::NoMatches
            }
        );
    }

    #[tokio::test]
    async fn test_snapshot_404_counts_as_reachable() {
        let resolver = Resolver::new(vec![
            ScriptedSource::boxed("dead", || Err(FetchError::Transport("refused".into()))),
            ScriptedSource::boxed("snapshot", || {
                Err(FetchError::NotFound("search/zzz.json".into()))
            }),
        ]);
        assert_eq!(
            resolver.resolve("zzz-nonexistent", None).await,
            RetrievalResult::Empty {
                reason: EmptyReason::NoMatches
            }
        );
    }

    #[tokio::test]
    async fn test_duplicate_urls_deduped_in_success() {
        fn dupes() -> Result<Vec<Article>, FetchError> {
            let mut list = articles(1);
            list.extend(articles(1));
            Ok(list)
        }
        let resolver = Resolver::new(vec![ScriptedSource::boxed("dupes", dupes)]);
        match resolver.resolve("technology", None).await {
            RetrievalResult::Success { articles, .. } => assert_eq!(articles.len(), 1),
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn test_sequencer_monotonic_and_supersedes() {
        let seq = RequestSequencer::new();
        let first = seq.issue();
        assert!(seq.is_current(first));
        let second = seq.issue();
        assert!(seq.is_current(second));
        assert!(!seq.is_current(first));
        assert!(second > first);
    }

    #[test]
    fn test_from_config_plan_order() {
        let config = PipelineConfig {
            guardian_api_key: Some("test-key".to_string()),
            ..PipelineConfig::default()
        };
        let resolver = Resolver::from_config(&config, reqwest::Client::new());
        assert_eq!(
            resolver.plan(),
            vec![
                "gdelt",
                "relay:api.allorigins.win",
                "relay:corsproxy.io",
                "guardian",
                "snapshot",
                "snapshot:latest",
            ]
        );
    }

    #[test]
    fn test_from_config_without_guardian_key() {
        let resolver = Resolver::from_config(&PipelineConfig::default(), reqwest::Client::new());
        assert!(!resolver.plan().contains(&"guardian".to_string()));
    }
}
