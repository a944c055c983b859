//! Pipeline configuration.
//!
//! The attempt plan is data, not code: endpoints, the ordered relay list, the
//! snapshot base URL, and the cache bounds all live here, so adding or
//! removing a source is a configuration change. Values come from an optional
//! YAML file with full defaults; the Guardian API key may additionally arrive
//! via CLI/environment and is merged in by the caller.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::time::Duration;
use tracing::info;

/// Configuration for the retrieval pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// GDELT DOC API endpoint (primary live source).
    pub gdelt_url: String,
    /// Guardian content API search endpoint (secondary live source).
    pub guardian_url: String,
    /// Guardian API key; the Guardian attempt is skipped when absent.
    pub guardian_api_key: Option<String>,
    /// Relay endpoints in fixed priority order. The primary URL is appended
    /// percent-encoded to each.
    pub relays: Vec<String>,
    /// Base URL of the pre-generated snapshot tree.
    pub snapshot_base_url: String,
    /// Per-attempt timeout in seconds.
    pub request_timeout_secs: u64,
    /// Result-count cap requested from live sources.
    pub max_records: usize,
    /// Cache entry time-to-live in seconds.
    pub cache_ttl_secs: i64,
    /// Maximum number of cached result sets.
    pub cache_max_entries: usize,
    /// Maximum number of search-history entries.
    pub history_max_entries: usize,
    /// Directory holding the persistent cache/history state file.
    pub store_dir: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            gdelt_url: "https://api.gdeltproject.org/api/v2/doc/doc".to_string(),
            guardian_url: "https://content.guardianapis.com/search".to_string(),
            guardian_api_key: None,
            relays: vec![
                "https://api.allorigins.win/get?url=".to_string(),
                "https://corsproxy.io/?".to_string(),
            ],
            snapshot_base_url: "https://news.example.org/news".to_string(),
            request_timeout_secs: 10,
            max_records: 25,
            cache_ttl_secs: 3600,
            cache_max_entries: 20,
            history_max_entries: 10,
            store_dir: ".newsfall".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from an optional YAML file.
    ///
    /// Missing path means defaults; an unreadable or malformed file is an
    /// error rather than a silent fallback.
    pub async fn load(path: Option<&str>) -> Result<Self, Box<dyn Error>> {
        match path {
            None => Ok(Self::default()),
            Some(path) => {
                let raw = tokio::fs::read_to_string(path).await?;
                let config: Self = serde_yaml::from_str(&raw)?;
                info!(path, relays = config.relays.len(), "Loaded pipeline configuration");
                Ok(config)
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache_ttl_secs)
    }
}
