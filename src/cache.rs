//! Bounded, TTL-expiring result cache with search history.
//!
//! The cache manager stores result sets keyed by the normalized
//! [`QueryKey`], enforces a fixed time-to-live on reads (lazy expiry, no
//! background sweep), and bounds the total entry count with
//! least-recently-inserted eviction. It also records the bounded,
//! most-recent-first search history — purely observational, never feeding
//! back into retrieval.
//!
//! # Persistence
//!
//! The whole store (entries + history) serializes to one JSON state file
//! under the store directory, loaded at startup and written back after
//! mutations. A missing or corrupt state file starts an empty store; local
//! state is never worth failing a search over.

use crate::models::{Article, CacheEntry, QueryKey, SearchHistoryEntry};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

const STATE_FILE: &str = "state.json";

#[derive(Debug, Default, Deserialize, Serialize)]
struct StoreState {
    entries: Vec<CacheEntry>,
    history: Vec<SearchHistoryEntry>,
}

/// Process-local cache of result sets, plus search history.
#[derive(Debug)]
pub struct CacheStore {
    entries: HashMap<QueryKey, CacheEntry>,
    history: Vec<SearchHistoryEntry>,
    ttl: Duration,
    max_entries: usize,
    max_history: usize,
    state_path: Option<PathBuf>,
}

impl CacheStore {
    /// In-memory store with no persistence. Used by tests and one-shot runs.
    pub fn in_memory(ttl: Duration, max_entries: usize, max_history: usize) -> Self {
        Self {
            entries: HashMap::new(),
            history: Vec::new(),
            ttl,
            max_entries,
            max_history,
            state_path: None,
        }
    }

    /// Open the persistent store under `dir`, loading any previous state.
    ///
    /// Unreadable or malformed state starts empty and is logged, never fatal.
    #[instrument(level = "info", skip_all, fields(dir = %dir.as_ref().display()))]
    pub async fn open(
        dir: impl AsRef<Path>,
        ttl: Duration,
        max_entries: usize,
        max_history: usize,
    ) -> Self {
        let state_path = dir.as_ref().join(STATE_FILE);
        let state = match fs::read_to_string(&state_path).await {
            Ok(raw) => match serde_json::from_str::<StoreState>(&raw) {
                Ok(state) => {
                    info!(
                        entries = state.entries.len(),
                        history = state.history.len(),
                        "Loaded cache state"
                    );
                    state
                }
                Err(e) => {
                    warn!(error = %e, "Cache state file is corrupt; starting empty");
                    StoreState::default()
                }
            },
            Err(_) => {
                debug!("No cache state file; starting empty");
                StoreState::default()
            }
        };

        Self {
            entries: state
                .entries
                .into_iter()
                .map(|e| (e.key.clone(), e))
                .collect(),
            history: state.history,
            ttl,
            max_entries,
            max_history,
            state_path: Some(state_path),
        }
    }

    /// Write the current state back to disk, creating the directory if needed.
    pub async fn save(&self) -> Result<(), Box<dyn Error>> {
        let Some(ref path) = self.state_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut entries: Vec<&CacheEntry> = self.entries.values().collect();
        entries.sort_by_key(|e| e.stored_at);
        let state = serde_json::json!({
            "entries": entries,
            "history": self.history,
        });
        fs::write(path, serde_json::to_string(&state)?).await?;
        debug!(path = %path.display(), "Wrote cache state");
        Ok(())
    }

    /// Look up a live entry for `key`, treating expired entries as absent.
    pub fn get(&self, key: &QueryKey) -> Option<&CacheEntry> {
        self.get_at(key, Utc::now())
    }

    fn get_at(&self, key: &QueryKey, now: DateTime<Utc>) -> Option<&CacheEntry> {
        self.entries
            .get(key)
            .filter(|entry| now - entry.stored_at < self.ttl)
    }

    /// Insert or overwrite the entry for `key` with a fresh `stored_at`, then
    /// evict the oldest entry if the store grew past its bound.
    pub fn put(&mut self, key: QueryKey, articles: Vec<Article>, source_label: &str) {
        self.put_at(key, articles, source_label, Utc::now());
    }

    fn put_at(
        &mut self,
        key: QueryKey,
        articles: Vec<Article>,
        source_label: &str,
        now: DateTime<Utc>,
    ) {
        self.entries.insert(
            key.clone(),
            CacheEntry {
                key,
                articles,
                stored_at: now,
                source_label: source_label.to_string(),
            },
        );

        if self.entries.len() > self.max_entries {
            // First-found wins among stored_at ties; any deterministic pick
            // satisfies the bound.
            if let Some(oldest) = self
                .entries
                .values()
                .min_by_key(|e| e.stored_at)
                .map(|e| e.key.clone())
            {
                debug!(query = %oldest.query, "Evicting oldest cache entry");
                self.entries.remove(&oldest);
            }
        }
    }

    /// Record a search, deduplicating by key and keeping most-recent-first
    /// order within the history bound.
    pub fn record_history(&mut self, query: &str, country: Option<&str>) {
        let key = QueryKey::new(query, country);
        self.history
            .retain(|h| QueryKey::new(&h.query, Some(&h.country)) != key);
        self.history.insert(
            0,
            SearchHistoryEntry {
                query: key.query.clone(),
                country: key.country.clone(),
                timestamp: Utc::now(),
            },
        );
        self.history.truncate(self.max_history);
    }

    pub fn history(&self) -> &[SearchHistoryEntry] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
