//! Static snapshot sources.
//!
//! Last-resort fallbacks reading the pre-generated snapshot tree (built by
//! the `snapshot` subcommand, see [`crate::outputs::json`]):
//!
//! 1. [`SnapshotKind::Exact`]: `search/<slug>.json`, addressed
//!    deterministically from the query (and optional country suffix). A 404
//!    here is [`FetchError::NotFound`] — an expected negative signal, not a
//!    failure — and must stay distinguishable from a malformed response.
//! 2. [`SnapshotKind::Latest`]: the generic `latest.json`, client-filtered by
//!    case-insensitive substring match of the query against title/summary,
//!    and by country when a filter is given.
//!
//! Every fetch carries a cache-busting `t` query parameter so stale CDN or
//! browser-layer copies never mask a refreshed tree.

use crate::error::FetchError;
use crate::models::{
    Article, FALLBACK_SOURCE, FALLBACK_TITLE, FALLBACK_URL, GLOBAL_COUNTRY, MAX_THEMES,
};
use crate::utils::{parse_upstream_date, slugify_query, truncate_summary};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::NewsSource;

/// Raw snapshot file envelope.
#[derive(Debug, Deserialize)]
pub struct SnapshotFile {
    #[serde(default)]
    pub articles: Vec<SnapshotRawArticle>,
}

/// One raw snapshot record: the normalized shape, but with a string date and
/// every field optional (older trees predate some fields).
#[derive(Debug, Default, Deserialize)]
pub struct SnapshotRawArticle {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub themes: Vec<String>,
}

impl SnapshotRawArticle {
    pub fn normalize(self, now: DateTime<Utc>) -> Article {
        let non_empty = |o: Option<String>| o.filter(|s| !s.trim().is_empty());
        Article {
            title: non_empty(self.title).unwrap_or_else(|| FALLBACK_TITLE.to_string()),
            url: non_empty(self.url).unwrap_or_else(|| FALLBACK_URL.to_string()),
            source: non_empty(self.source).unwrap_or_else(|| FALLBACK_SOURCE.to_string()),
            published_at: self
                .date
                .as_deref()
                .and_then(parse_upstream_date)
                .unwrap_or(now),
            country: non_empty(self.country).unwrap_or_else(|| GLOBAL_COUNTRY.to_string()),
            summary: truncate_summary(self.summary.as_deref().unwrap_or("")),
            image: non_empty(self.image),
            themes: self.themes.into_iter().take(MAX_THEMES).collect(),
        }
    }
}

/// Which snapshot resource this attempt addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    /// The slug-addressed `search/<slug>.json` for this exact query.
    Exact,
    /// The generic `latest.json`, filtered client-side.
    Latest,
}

/// Snapshot-tree source.
pub struct SnapshotSource {
    client: reqwest::Client,
    base_url: String,
    kind: SnapshotKind,
}

impl SnapshotSource {
    pub fn new(client: reqwest::Client, base_url: &str, kind: SnapshotKind) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            kind,
        }
    }

    fn path_for(&self, query: &str, country: Option<&str>) -> String {
        match self.kind {
            SnapshotKind::Exact => {
                format!("{}/search/{}.json", self.base_url, slugify_query(query, country))
            }
            SnapshotKind::Latest => format!("{}/latest.json", self.base_url),
        }
    }

    async fn fetch_file(&self, path: &str) -> Result<SnapshotFile, FetchError> {
        let response = self
            .client
            .get(path)
            .query(&[("t", Utc::now().timestamp_millis().to_string())])
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            warn!(%status, path, "Snapshot fetch returned error status");
            return Err(FetchError::Transport(format!("status {status}")));
        }
        Ok(serde_json::from_str(&response.text().await?)?)
    }
}

/// Filter normalized latest-snapshot articles down to a query and country.
pub fn filter_latest(articles: Vec<Article>, query: &str, country: Option<&str>) -> Vec<Article> {
    articles
        .into_iter()
        .filter(|a| a.matches(query))
        .filter(|a| match country {
            Some(c) if !c.trim().is_empty() => a.country.eq_ignore_ascii_case(c.trim()),
            _ => true,
        })
        .collect()
}

#[async_trait]
impl NewsSource for SnapshotSource {
    fn label(&self) -> String {
        match self.kind {
            SnapshotKind::Exact => "snapshot".to_string(),
            SnapshotKind::Latest => "snapshot:latest".to_string(),
        }
    }

    #[instrument(level = "info", skip_all, fields(kind = ?self.kind, query = %query))]
    async fn fetch(&self, query: &str, country: Option<&str>) -> Result<Vec<Article>, FetchError> {
        let path = self.path_for(query, country);
        let file = self.fetch_file(&path).await?;
        let now = Utc::now();
        let articles: Vec<Article> = file
            .articles
            .into_iter()
            .map(|raw| raw.normalize(now))
            .collect();

        let articles = match self.kind {
            SnapshotKind::Exact => articles,
            SnapshotKind::Latest => filter_latest(articles, query, country),
        };
        info!(count = articles.len(), path, "Read snapshot articles");
        Ok(articles)
    }
}
