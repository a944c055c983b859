//! Data models for the retrieval pipeline.
//!
//! This module defines the normalized contract every upstream source maps
//! onto, plus the pipeline's key and result types:
//! - [`Article`]: the single normalized article shape
//! - [`QueryKey`]: normalized (query, country) cache key
//! - [`RetrievalResult`] / [`EmptyReason`]: tagged resolver outcome
//! - [`ResultSet`]: serialized result envelope, also the snapshot file shape
//! - [`CacheEntry`] / [`SearchHistoryEntry`]: cache manager records
//! - [`TrendPoint`] / [`TrendingReport`]: volume-timeline records
//!
//! Every [`Article`] field has a defined fallback value; no field is ever
//! absent in normalized form. Fallback and non-empty checks operate on
//! normalized records only, never on raw upstream fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of topic tags kept per article.
pub const MAX_THEMES: usize = 5;

/// Fallback title for records missing one.
pub const FALLBACK_TITLE: &str = "No title";

/// Fallback (placeholder) URL.
pub const FALLBACK_URL: &str = "#";

/// Fallback source name.
pub const FALLBACK_SOURCE: &str = "Unknown";

/// Country value for articles without an attribution, and for worldwide queries.
pub const GLOBAL_COUNTRY: &str = "Global";

/// A normalized news article.
///
/// This is the target contract all sources map onto before any fallback or
/// non-empty decision is made. Serializes to the snapshot-file article shape
/// (`date` as an RFC 3339 string).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Article {
    /// The article headline. Falls back to [`FALLBACK_TITLE`].
    pub title: String,
    /// Link to the article; may be the [`FALLBACK_URL`] placeholder.
    pub url: String,
    /// Source name or domain. Falls back to [`FALLBACK_SOURCE`].
    pub source: String,
    /// Publication timestamp, normalized from the upstream format.
    #[serde(rename = "date")]
    pub published_at: DateTime<Utc>,
    /// ISO-ish country code, or [`GLOBAL_COUNTRY`].
    pub country: String,
    /// Plain-text summary, truncated with an ellipsis marker. May be empty.
    pub summary: String,
    /// Thumbnail URL, when the source provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Topic tags, at most [`MAX_THEMES`]. Empty for sources without them.
    #[serde(default)]
    pub themes: Vec<String>,
}

impl Article {
    /// Case-insensitive substring match of `needle` against title and summary.
    ///
    /// Used to client-filter the generic "latest" snapshot.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&needle)
            || self.summary.to_lowercase().contains(&needle)
    }
}

/// Normalized cache lookup key.
///
/// Construction is the single normalization point: the query is trimmed and
/// lowercased, the country trimmed and uppercased, with empty meaning
/// worldwide. Equivalent queries collide predictably.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct QueryKey {
    pub query: String,
    pub country: String,
}

impl QueryKey {
    pub fn new(query: &str, country: Option<&str>) -> Self {
        Self {
            query: query.trim().to_lowercase(),
            country: country.unwrap_or("").trim().to_uppercase(),
        }
    }

    /// Country filter as the resolver expects it: `None` for worldwide.
    pub fn country_filter(&self) -> Option<&str> {
        if self.country.is_empty() {
            None
        } else {
            Some(&self.country)
        }
    }
}

/// Why a resolution produced no articles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    /// Every source failed at the transport or decode level.
    NoSourcesReachable,
    /// At least one source answered, but nothing matched the query.
    NoMatches,
}

/// Outcome of a full resolution walk.
///
/// `Success` always carries a non-empty, fully-normalized article list; a
/// successful-but-empty source advances the walk instead.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalResult {
    Success {
        articles: Vec<Article>,
        source_label: String,
    },
    Empty {
        reason: EmptyReason,
    },
}

/// Serialized result envelope.
///
/// This is both what `search` prints and the shape of the pre-generated
/// snapshot files (`latest.json`, `search/<slug>.json`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResultSet {
    pub query: String,
    pub timestamp: DateTime<Utc>,
    pub total: usize,
    pub articles: Vec<Article>,
    /// Label of the source that produced this set (e.g. `"gdelt"`,
    /// `"relay:api.allorigins.win"`, `"snapshot"`).
    pub source: String,
}

impl ResultSet {
    pub fn new(query: &str, articles: Vec<Article>, source: &str) -> Self {
        Self {
            query: query.to_string(),
            timestamp: Utc::now(),
            total: articles.len(),
            articles,
            source: source.to_string(),
        }
    }
}

/// One cached result set.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheEntry {
    pub key: QueryKey,
    pub articles: Vec<Article>,
    pub stored_at: DateTime<Utc>,
    pub source_label: String,
}

/// One recorded search, purely observational.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchHistoryEntry {
    pub query: String,
    pub country: String,
    pub timestamp: DateTime<Utc>,
}

/// One point of the GDELT volume timeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrendPoint {
    /// GDELT hour bucket, `YYYYMMDDHH`.
    pub date: String,
    pub value: f64,
}

/// Volume-timeline report, possibly synthetic.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrendingReport {
    pub timestamp: DateTime<Utc>,
    pub trends: Vec<TrendPoint>,
    /// Set when the series is synthetic fallback data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}
