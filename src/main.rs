//! # newsfall
//!
//! A multi-source news retrieval pipeline with layered fallback and a
//! bounded local cache. A query is resolved cache-first, then walked down an
//! ordered chain of sources — live GDELT API, relay-wrapped calls, the
//! Guardian API, and finally static pre-generated snapshot files — and the
//! first non-empty normalized result wins.
//!
//! ## Usage
//!
//! ```sh
//! newsfall search "climate change" --country DE
//! newsfall snapshot --output-dir ./news
//! ```
//!
//! ## Architecture
//!
//! 1. **Cache**: (query, country) keys with TTL expiry and bounded eviction
//! 2. **Resolution**: ordered short-circuiting source walk
//! 3. **Normalization**: every upstream shape maps onto one Article contract
//! 4. **Output**: result sets as JSON on stdout, or a snapshot tree on disk

use chrono::Utc;
use clap::Parser;
use itertools::Itertools;
use std::error::Error;
use std::time::Duration as StdDuration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cache;
mod cli;
mod config;
mod error;
mod models;
mod outputs;
mod pipeline;
mod resolver;
mod sources;
mod utils;

use cache::CacheStore;
use cli::{Cli, Command};
use config::PipelineConfig;
use models::{Article, EmptyReason, ResultSet, RetrievalResult};
use outputs::json::{self as json_out, SnapshotIndex};
use pipeline::Pipeline;
use resolver::Resolver;
use sources::gdelt::{self, GdeltSource};
use sources::NewsSource;

/// Fixed country searches in the snapshot batch.
const COUNTRY_SEARCHES: &[(&str, &str)] = &[
    ("Russia", "RU"),
    ("Ukraine", "UA"),
    ("USA", "US"),
    ("UK", "GB"),
    ("Germany", "DE"),
    ("France", "FR"),
    ("China", "CN"),
];

/// Popular worldwide searches in the snapshot batch.
const POPULAR_SEARCHES: &[&str] = &[
    "climate change",
    "artificial intelligence",
    "business",
    "sports",
    "health",
    "election",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();

    // --- Config, with CLI/env overrides ---
    let mut config = PipelineConfig::load(args.config.as_deref()).await?;
    if args.guardian_api_key.is_some() {
        config.guardian_api_key = args.guardian_api_key.clone();
    }
    if let Some(ref dir) = args.store_dir {
        config.store_dir = dir.clone();
    }

    let client = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()?;

    match args.command {
        Command::Search {
            query,
            country,
            max_records,
            no_cache,
        } => {
            if let Some(max) = max_records {
                config.max_records = max;
            }
            run_search(&config, client, &query, country.as_deref(), !no_cache).await?;
        }
        Command::Snapshot { output_dir } => {
            run_snapshot(&config, client, &output_dir).await?;
        }
        Command::History => {
            run_history(&config).await;
        }
        Command::Trending { hours } => {
            let report = gdelt::fetch_trending(&client, &config.gdelt_url, hours).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    info!(elapsed_ms = start_time.elapsed().as_millis() as u64, "Done");
    Ok(())
}

/// Resolve one query through the cache-first pipeline and print the result.
async fn run_search(
    config: &PipelineConfig,
    client: reqwest::Client,
    query: &str,
    country: Option<&str>,
    use_cache: bool,
) -> Result<(), Box<dyn Error>> {
    let cache = CacheStore::open(
        &config.store_dir,
        config.cache_ttl(),
        config.cache_max_entries,
        config.history_max_entries,
    )
    .await;
    let resolver = Resolver::from_config(config, client);
    info!(plan = ?resolver.plan(), "Resolved attempt plan");

    let mut pipeline = Pipeline::new(resolver, cache);
    let outcome = pipeline.search(query, country, use_cache).await;

    if let Err(e) = pipeline.save().await {
        warn!(error = %e, "Failed to persist cache state");
    }

    match outcome.result {
        RetrievalResult::Success {
            articles,
            source_label,
        } => {
            info!(
                count = articles.len(),
                source = %source_label,
                from_cache = outcome.from_cache,
                "Search succeeded"
            );
            let set = ResultSet::new(query, articles, &source_label);
            println!("{}", serde_json::to_string_pretty(&set)?);
        }
        RetrievalResult::Empty { reason } => {
            // Distinct messaging per reason; an empty result is never fatal.
            match reason {
                EmptyReason::NoSourcesReachable => {
                    error!("No news sources are reachable right now")
                }
                EmptyReason::NoMatches => info!(query, "No articles matched"),
            }
            let empty = serde_json::json!({
                "query": query,
                "timestamp": Utc::now(),
                "total": 0,
                "articles": [],
                "reason": reason,
            });
            println!("{}", serde_json::to_string_pretty(&empty)?);
        }
    }
    Ok(())
}

/// Pre-generate the static snapshot tree: trending, latest, per-query search
/// sets, and the manifest. Individual fetch failures skip that file and keep
/// the batch going.
async fn run_snapshot(
    config: &PipelineConfig,
    client: reqwest::Client,
    output_dir: &str,
) -> Result<(), Box<dyn Error>> {
    info!(output_dir, "Generating snapshot tree");

    // Trending always lands first; it degrades to a synthetic series.
    let trending = gdelt::fetch_trending(&client, &config.gdelt_url, 24).await;
    json_out::write_trending(output_dir, &trending).await?;

    let mut all_articles: Vec<Article> = Vec::new();
    let mut searches_written = 0usize;

    // Default technology set, doubling as the seed for latest.json.
    let tech_source = GdeltSource::new(client.clone(), &config.gdelt_url, 30);
    match tech_source.fetch("technology", None).await {
        Ok(articles) if !articles.is_empty() => {
            let set = ResultSet::new("technology", articles.clone(), &tech_source.label());
            json_out::write_search_set(output_dir, &set, None).await?;
            all_articles.extend(articles);
            searches_written += 1;
        }
        Ok(_) => warn!("Technology fetch returned no articles"),
        Err(e) => warn!(error = %e, "Technology fetch failed; skipping"),
    }

    // Country-specific sets.
    let country_source = GdeltSource::new(client.clone(), &config.gdelt_url, 20);
    for &(query, country) in COUNTRY_SEARCHES {
        match country_source.fetch(query, Some(country)).await {
            Ok(articles) if !articles.is_empty() => {
                let set = ResultSet::new(query, articles.clone(), &country_source.label());
                json_out::write_search_set(output_dir, &set, Some(country)).await?;
                all_articles.extend(articles);
                searches_written += 1;
            }
            Ok(_) => warn!(query, country, "No articles for country search"),
            Err(e) => warn!(query, country, error = %e, "Country search failed; skipping"),
        }
        // Be nice to the API between calls.
        tokio::time::sleep(StdDuration::from_secs(1)).await;
    }

    // Popular worldwide sets.
    let popular_source = GdeltSource::new(client.clone(), &config.gdelt_url, 15);
    for &query in POPULAR_SEARCHES {
        match popular_source.fetch(query, None).await {
            Ok(articles) if !articles.is_empty() => {
                let set = ResultSet::new(query, articles.clone(), &popular_source.label());
                json_out::write_search_set(output_dir, &set, None).await?;
                all_articles.extend(articles);
                searches_written += 1;
            }
            Ok(_) => warn!(query, "No articles for popular search"),
            Err(e) => warn!(query, error = %e, "Popular search failed; skipping"),
        }
        tokio::time::sleep(StdDuration::from_secs(1)).await;
    }

    // Merged newest-first latest.json, deduped by URL.
    let latest: Vec<Article> = all_articles
        .into_iter()
        .unique_by(|a| a.url.clone())
        .sorted_by_key(|a| std::cmp::Reverse(a.published_at))
        .take(30)
        .collect();
    json_out::write_latest(output_dir, &ResultSet::new("latest", latest, "gdelt")).await?;

    json_out::write_index(
        output_dir,
        &SnapshotIndex {
            last_update: Utc::now(),
            countries: COUNTRY_SEARCHES.iter().map(|(_, c)| c.to_string()).collect(),
            searches: searches_written,
        },
    )
    .await?;

    info!(searches = searches_written, "Snapshot tree complete");
    Ok(())
}

/// Print the recorded search history, most recent first.
async fn run_history(config: &PipelineConfig) {
    let cache = CacheStore::open(
        &config.store_dir,
        config.cache_ttl(),
        config.cache_max_entries,
        config.history_max_entries,
    )
    .await;
    for entry in cache.history() {
        let scope = if entry.country.is_empty() {
            "worldwide".to_string()
        } else {
            entry.country.clone()
        };
        println!("{}  {}  ({})", entry.timestamp.to_rfc3339(), entry.query, scope);
    }
}
