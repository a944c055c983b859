//! JSON file writers for the snapshot tree.
//!
//! Each writer ensures its directory exists, serializes with `serde_json`,
//! and logs the written path. Write failures surface to the caller; a batch
//! run decides per file whether to continue.

use crate::models::{ResultSet, TrendingReport};
use crate::utils::slugify_query;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// Manifest describing a generated snapshot tree.
#[derive(Debug, Serialize)]
pub struct SnapshotIndex {
    pub last_update: DateTime<Utc>,
    pub countries: Vec<String>,
    pub searches: usize,
}

async fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?).await?;
    info!(path = %path.display(), "Wrote JSON file");
    Ok(())
}

/// Write a per-query result set to `search/<slug>.json`.
///
/// Returns the written path so the caller can report it.
#[instrument(level = "info", skip(set), fields(query = %set.query))]
pub async fn write_search_set(
    output_dir: &str,
    set: &ResultSet,
    country: Option<&str>,
) -> Result<PathBuf, Box<dyn Error>> {
    let slug = slugify_query(&set.query, country);
    let path = Path::new(output_dir).join("search").join(format!("{slug}.json"));
    write_json(set, &path).await?;
    Ok(path)
}

/// Write the merged newest-first set to `latest.json`.
#[instrument(level = "info", skip(set))]
pub async fn write_latest(output_dir: &str, set: &ResultSet) -> Result<(), Box<dyn Error>> {
    write_json(set, &Path::new(output_dir).join("latest.json")).await
}

/// Write the volume timeline to `trending.json`.
#[instrument(level = "info", skip(report))]
pub async fn write_trending(
    output_dir: &str,
    report: &TrendingReport,
) -> Result<(), Box<dyn Error>> {
    write_json(report, &Path::new(output_dir).join("trending.json")).await
}

/// Write the tree manifest to `index.json`.
#[instrument(level = "info", skip(index))]
pub async fn write_index(output_dir: &str, index: &SnapshotIndex) -> Result<(), Box<dyn Error>> {
    write_json(index, &Path::new(output_dir).join("index.json")).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Article;
    use crate::models::GLOBAL_COUNTRY;
    use crate::sources::snapshot::SnapshotFile;

    fn set(query: &str) -> ResultSet {
        ResultSet::new(
            query,
            vec![Article {
                title: "Tech news".to_string(),
                url: "https://example.com/tech".to_string(),
                source: "example.com".to_string(),
                published_at: Utc::now(),
                country: GLOBAL_COUNTRY.to_string(),
                summary: "chips".to_string(),
                image: None,
                themes: vec![],
            }],
            "gdelt",
        )
    }

    #[tokio::test]
    async fn test_write_search_set_uses_slug_path() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().to_str().unwrap();
        let path = write_search_set(out, &set("Climate Change"), Some("DE"))
            .await
            .unwrap();
        assert!(path.ends_with("search/climate_change_de.json"));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_written_set_reads_back_as_snapshot_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().to_str().unwrap();
        write_latest(out, &set("technology")).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join("latest.json")).unwrap();
        let file: SnapshotFile = serde_json::from_str(&raw).unwrap();
        assert_eq!(file.articles.len(), 1);
    }

    #[tokio::test]
    async fn test_write_index() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().to_str().unwrap();
        write_index(
            out,
            &SnapshotIndex {
                last_update: Utc::now(),
                countries: vec!["RU".to_string(), "US".to_string()],
                searches: 14,
            },
        )
        .await
        .unwrap();
        let raw = std::fs::read_to_string(dir.path().join("index.json")).unwrap();
        assert!(raw.contains("\"searches\": 14"));
    }
}
