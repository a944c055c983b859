//! The Guardian content API source.
//!
//! Secondary live source, attempted after the relay walk when an API key is
//! configured. The Guardian has no source-country filter, so the country
//! filter is not forwarded; the normalized `country` field is derived from
//! the article's section instead (`us-news` → `US`, `world/russia` → `RU`,
//! and so on).
//!
//! # Upstream shape
//!
//! The payload nests results under `response.results[]`, with the richer
//! text fields under each result's `fields` object:
//!
//! ```text
//! { "response": { "results": [ { "webTitle", "webUrl", "webPublicationDate",
//!   "sectionId", "fields": { "headline", "trailText", "thumbnail" } } ] } }
//! ```
//!
//! Trail text arrives as an HTML fragment and is stripped to plain text
//! during normalization.

use crate::error::FetchError;
use crate::models::{Article, FALLBACK_TITLE, FALLBACK_URL, GLOBAL_COUNTRY};
use crate::utils::{parse_upstream_date, strip_tags, truncate_summary};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, instrument, warn};
use url::Url;

use super::NewsSource;

#[derive(Debug, Deserialize)]
struct GuardianResponse {
    response: GuardianInner,
}

#[derive(Debug, Default, Deserialize)]
struct GuardianInner {
    #[serde(default)]
    results: Vec<GuardianResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardianResult {
    #[serde(default)]
    pub web_title: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub web_publication_date: Option<String>,
    #[serde(default)]
    pub section_id: Option<String>,
    #[serde(default)]
    pub fields: GuardianFields,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardianFields {
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub trail_text: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

/// Map a Guardian section id onto a country code.
fn section_to_country(section: &str) -> &'static str {
    match section {
        "us-news" => "US",
        "uk-news" => "GB",
        "australia-news" => "AU",
        "world/russia" => "RU",
        "world/ukraine" => "UA",
        "world/germany" => "DE",
        "world/france" => "FR",
        "world/japan" => "JP",
        "world/india" => "IN",
        "world/china" => "CN",
        "world/europe-news" => "EU",
        _ => GLOBAL_COUNTRY,
    }
}

impl GuardianResult {
    pub fn normalize(self, now: DateTime<Utc>) -> Article {
        let non_empty = |o: Option<String>| o.filter(|s| !s.trim().is_empty());
        Article {
            title: non_empty(self.fields.headline)
                .or_else(|| non_empty(self.web_title))
                .unwrap_or_else(|| FALLBACK_TITLE.to_string()),
            url: non_empty(self.web_url).unwrap_or_else(|| FALLBACK_URL.to_string()),
            source: "The Guardian".to_string(),
            published_at: self
                .web_publication_date
                .as_deref()
                .and_then(parse_upstream_date)
                .unwrap_or(now),
            country: section_to_country(self.section_id.as_deref().unwrap_or("")).to_string(),
            summary: truncate_summary(&strip_tags(
                self.fields.trail_text.as_deref().unwrap_or(""),
            )),
            image: non_empty(self.fields.thumbnail),
            themes: Vec::new(),
        }
    }
}

/// Parse a Guardian search payload into normalized articles.
pub fn parse_search(body: &str) -> Result<Vec<Article>, FetchError> {
    let parsed: GuardianResponse = serde_json::from_str(body)?;
    let now = Utc::now();
    Ok(parsed
        .response
        .results
        .into_iter()
        .map(|r| r.normalize(now))
        .collect())
}

/// Secondary live source against the Guardian content API.
pub struct GuardianSource {
    client: reqwest::Client,
    search_url: String,
    api_key: String,
    page_size: usize,
}

impl GuardianSource {
    pub fn new(
        client: reqwest::Client,
        search_url: &str,
        api_key: &str,
        page_size: usize,
    ) -> Self {
        Self {
            client,
            search_url: search_url.to_string(),
            api_key: api_key.to_string(),
            page_size,
        }
    }
}

#[async_trait]
impl NewsSource for GuardianSource {
    fn label(&self) -> String {
        "guardian".to_string()
    }

    #[instrument(level = "info", skip_all, fields(query = %query))]
    async fn fetch(&self, query: &str, _country: Option<&str>) -> Result<Vec<Article>, FetchError> {
        let mut url = Url::parse(&self.search_url)
            .map_err(|e| FetchError::Transport(format!("bad search url: {e}")))?;
        url.query_pairs_mut()
            .append_pair("q", query.trim())
            .append_pair("page-size", &self.page_size.to_string())
            .append_pair("show-fields", "headline,trailText,thumbnail")
            .append_pair("order-by", "relevance")
            .append_pair("api-key", &self.api_key);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Guardian returned error status");
            return Err(FetchError::Transport(format!("status {status}")));
        }

        let articles = parse_search(&response.text().await?)?;
        info!(count = articles.len(), "Fetched Guardian articles");
        Ok(articles)
    }
}
