//! GDELT DOC API source.
//!
//! The primary live source. One HTTP GET per attempt against the DOC 2.0
//! `artlist` mode, filtered by `sourcecountry` when a country is given. This
//! module also serves the volume timeline (`timelinevol` mode) used by the
//! `trending` subcommand, with a deterministic synthetic series as fallback.
//!
//! # Upstream shape
//!
//! ```text
//! { "articles": [ { "title", "url", "domain", "seendate": "YYYYMMDDHHMMSS",
//!                   "sourcecountry", "language", "socialimage", ... } ] }
//! ```
//!
//! Records regularly omit fields; normalization supplies every fallback
//! before the result is counted.

use crate::error::FetchError;
use crate::models::{
    Article, TrendPoint, TrendingReport, FALLBACK_SOURCE, FALLBACK_TITLE, FALLBACK_URL,
    GLOBAL_COUNTRY, MAX_THEMES,
};
use crate::utils::{parse_upstream_date, truncate_for_log, truncate_summary};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::NewsSource;

/// Raw GDELT artlist response envelope.
#[derive(Debug, Deserialize)]
pub struct GdeltResponse {
    #[serde(default)]
    pub articles: Vec<GdeltRawArticle>,
}

/// One raw artlist record. Everything is optional upstream.
#[derive(Debug, Default, Deserialize)]
pub struct GdeltRawArticle {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub seendate: Option<String>,
    #[serde(default)]
    pub sourcecountry: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub socialimage: Option<String>,
    #[serde(default)]
    pub themes: Vec<String>,
}

impl GdeltRawArticle {
    /// Map onto the normalized [`Article`] shape, with `now` as the
    /// published-at fallback for records missing a parseable `seendate`.
    pub fn normalize(self, now: DateTime<Utc>) -> Article {
        let non_empty = |o: Option<String>| o.filter(|s| !s.trim().is_empty());
        Article {
            title: non_empty(self.title).unwrap_or_else(|| FALLBACK_TITLE.to_string()),
            url: non_empty(self.url).unwrap_or_else(|| FALLBACK_URL.to_string()),
            source: non_empty(self.domain).unwrap_or_else(|| FALLBACK_SOURCE.to_string()),
            published_at: self
                .seendate
                .as_deref()
                .and_then(parse_upstream_date)
                .unwrap_or(now),
            country: non_empty(self.sourcecountry).unwrap_or_else(|| GLOBAL_COUNTRY.to_string()),
            summary: truncate_summary(self.content.as_deref().unwrap_or("")),
            image: non_empty(self.socialimage),
            themes: self.themes.into_iter().take(MAX_THEMES).collect(),
        }
    }
}

/// Build the artlist request URL for a query and optional country filter.
///
/// Shared with the relay source, which wraps this exact URL.
pub fn build_artlist_url(
    api_url: &str,
    query: &str,
    country: Option<&str>,
    max_records: usize,
) -> Result<Url, FetchError> {
    let mut url =
        Url::parse(api_url).map_err(|e| FetchError::Transport(format!("bad api url: {e}")))?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs
            .append_pair("query", query.trim())
            .append_pair("mode", "artlist")
            .append_pair("format", "json")
            .append_pair("maxrecords", &max_records.to_string())
            .append_pair("sort", "date");
        if let Some(country) = country.filter(|c| !c.trim().is_empty()) {
            pairs.append_pair("sourcecountry", country.trim());
        }
    }
    Ok(url)
}

/// Parse an artlist payload into normalized articles.
///
/// Shared with the relay source, which may hand over an unwrapped payload.
pub fn parse_artlist(body: &str) -> Result<Vec<Article>, FetchError> {
    let response: GdeltResponse = serde_json::from_str(body).map_err(|e| {
        debug!(
            error = %e,
            body_preview = %truncate_for_log(body, 200),
            "GDELT payload did not parse"
        );
        FetchError::Decode(e.to_string())
    })?;
    let now = Utc::now();
    Ok(response
        .articles
        .into_iter()
        .map(|raw| raw.normalize(now))
        .collect())
}

/// Primary live source against the GDELT DOC API.
pub struct GdeltSource {
    client: reqwest::Client,
    api_url: String,
    max_records: usize,
}

impl GdeltSource {
    pub fn new(client: reqwest::Client, api_url: &str, max_records: usize) -> Self {
        Self {
            client,
            api_url: api_url.to_string(),
            max_records,
        }
    }
}

#[async_trait]
impl NewsSource for GdeltSource {
    fn label(&self) -> String {
        "gdelt".to_string()
    }

    #[instrument(level = "info", skip_all, fields(query = %query))]
    async fn fetch(&self, query: &str, country: Option<&str>) -> Result<Vec<Article>, FetchError> {
        let url = build_artlist_url(&self.api_url, query, country, self.max_records)?;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%status, "GDELT returned error status");
            return Err(FetchError::Transport(format!("status {status}")));
        }
        let body = response.text().await?;
        let articles = parse_artlist(&body)?;
        info!(count = articles.len(), "Fetched GDELT articles");
        Ok(articles)
    }
}

/// Fetch the GDELT volume timeline for the past `hours`.
///
/// Any failure degrades to a deterministic synthetic series rather than an
/// error; trending is decorative and must never break a run.
#[instrument(level = "info", skip(client))]
pub async fn fetch_trending(client: &reqwest::Client, api_url: &str, hours: i64) -> TrendingReport {
    match try_fetch_trending(client, api_url, hours).await {
        Ok(report) => report,
        Err(e) => {
            warn!(error = %e, "Trending fetch failed; using synthetic series");
            synthetic_trending(Utc::now())
        }
    }
}

async fn try_fetch_trending(
    client: &reqwest::Client,
    api_url: &str,
    hours: i64,
) -> Result<TrendingReport, FetchError> {
    #[derive(Debug, Deserialize)]
    struct TimelineSeries {
        #[serde(default)]
        data: Vec<RawPoint>,
    }
    #[derive(Debug, Deserialize)]
    struct RawPoint {
        #[serde(default)]
        date: String,
        #[serde(default)]
        value: f64,
    }
    #[derive(Debug, Deserialize)]
    struct TimelineResponse {
        #[serde(default)]
        timeline: Vec<TimelineSeries>,
    }

    let end = Utc::now();
    let start = end - Duration::hours(hours);
    let mut url =
        Url::parse(api_url).map_err(|e| FetchError::Transport(format!("bad api url: {e}")))?;
    url.query_pairs_mut()
        .append_pair("query", "*")
        .append_pair("mode", "timelinevol")
        .append_pair("format", "json")
        .append_pair("startdatetime", &start.format("%Y%m%d%H%M%S").to_string())
        .append_pair("enddatetime", &end.format("%Y%m%d%H%M%S").to_string());

    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Transport(format!("status {status}")));
    }
    let parsed: TimelineResponse = serde_json::from_str(&response.text().await?)?;

    let trends: Vec<TrendPoint> = parsed
        .timeline
        .into_iter()
        .flat_map(|series| series.data)
        .take(30)
        .map(|p| TrendPoint {
            date: p.date,
            value: p.value,
        })
        .collect();
    info!(points = trends.len(), "Fetched trending timeline");
    Ok(TrendingReport {
        timestamp: Utc::now(),
        trends,
        note: None,
    })
}

/// Deterministic stand-in series: 15 hourly buckets, linearly decreasing.
pub fn synthetic_trending(now: DateTime<Utc>) -> TrendingReport {
    let trends = (0..15)
        .map(|i| TrendPoint {
            date: (now - Duration::hours(i)).format("%Y%m%d%H").to_string(),
            value: (1000 - i * 50) as f64,
        })
        .collect();
    TrendingReport {
        timestamp: now,
        trends,
        note: Some("Synthetic data - API unavailable".to_string()),
    }
}
