//! Utility functions for slug derivation, text normalization, and timestamp parsing.
//!
//! This module provides helper functions used throughout the pipeline:
//! - Filesystem-safe slug derivation for snapshot addressing
//! - Summary truncation and HTML-fragment stripping for normalization
//! - Timestamp parsing across the heterogeneous upstream date formats
//! - String truncation for logging

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum length of a snapshot slug before the optional country suffix.
pub const SLUG_MAX_LEN: usize = 50;

/// Maximum normalized summary length, excluding the ellipsis marker.
pub const SUMMARY_MAX_LEN: usize = 300;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Derive a filesystem-safe slug from a query.
///
/// Lowercases the query, collapses every run of non-alphanumeric characters
/// into a single underscore, strips leading/trailing underscores, and
/// truncates to [`SLUG_MAX_LEN`]. An optional country code is appended as a
/// lowercased suffix.
///
/// Equivalent queries must collide: `"Climate Change"` and `" climate  change "`
/// both address `search/climate_change.json`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify_query("Climate Change", None), "climate_change");
/// assert_eq!(slugify_query("technology", Some("US")), "technology_us");
/// ```
pub fn slugify_query(query: &str, country: Option<&str>) -> String {
    let mut slug = String::new();
    let mut last_was_sep = true;
    for c in query.trim().to_lowercase().chars() {
        if c.is_alphanumeric() {
            slug.push(c);
            last_was_sep = false;
        } else if !last_was_sep {
            slug.push('_');
            last_was_sep = true;
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    // Counted in chars; slugs may contain multibyte alphanumerics.
    if slug.chars().count() > SLUG_MAX_LEN {
        slug = slug.chars().take(SLUG_MAX_LEN).collect();
    }
    while slug.ends_with('_') {
        slug.pop();
    }

    match country {
        Some(c) if !c.trim().is_empty() => format!("{}_{}", slug, c.trim().to_lowercase()),
        _ => slug,
    }
}

/// Truncate a summary to [`SUMMARY_MAX_LEN`] characters with an ellipsis marker.
///
/// Operates on characters rather than bytes so multi-byte text never splits
/// mid-codepoint. Short summaries pass through unchanged.
pub fn truncate_summary(summary: &str) -> String {
    let trimmed = summary.trim();
    if trimmed.chars().count() <= SUMMARY_MAX_LEN {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(SUMMARY_MAX_LEN).collect();
        format!("{}…", cut.trim_end())
    }
}

/// Strip HTML fragments from upstream text.
///
/// Guardian trail text arrives wrapped in `<p>` and may carry inline markup;
/// the normalized summary is plain text.
pub fn strip_tags(text: &str) -> String {
    TAG_RE.replace_all(text, "").trim().to_string()
}

/// Parse a timestamp from any of the upstream date formats.
///
/// Handles, in order:
/// - GDELT compact form: `YYYYMMDDHHMMSS` (seendate) or `YYYYMMDDHH` (timeline buckets)
/// - RFC 3339 / ISO 8601 with offset: `2025-05-06T14:30:00Z`
/// - ISO 8601 without offset: `2025-05-06T14:30:00` (assumed UTC)
/// - Bare dates: `YYYYMMDD` or `2025-05-06` (midnight UTC)
///
/// Returns `None` for anything else; callers supply the fallback.
pub fn parse_upstream_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if raw.len() >= 8 && raw.chars().all(|c| c.is_ascii_digit()) {
        let padded = format!("{:0<14}", &raw[..raw.len().min(14)]);
        if let Ok(naive) = NaiveDateTime::parse_from_str(&padded, "%Y%m%d%H%M%S") {
            return Some(naive.and_utc());
        }
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }

    None
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` bytes with an ellipsis and byte count
/// indicator appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut cut = max;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_slugify_query_basic() {
        assert_eq!(slugify_query("technology", None), "technology");
        assert_eq!(slugify_query("Climate Change", None), "climate_change");
        assert_eq!(
            slugify_query("artificial intelligence", None),
            "artificial_intelligence"
        );
    }

    #[test]
    fn test_slugify_query_collapses_runs() {
        assert_eq!(slugify_query("multiple   spaces", None), "multiple_spaces");
        assert_eq!(slugify_query("hello--world!!now", None), "hello_world_now");
    }

    #[test]
    fn test_slugify_query_equivalent_queries_collide() {
        assert_eq!(
            slugify_query("  Climate  Change ", None),
            slugify_query("climate change", None)
        );
    }

    #[test]
    fn test_slugify_query_country_suffix() {
        assert_eq!(slugify_query("Russia", Some("RU")), "russia_ru");
        assert_eq!(slugify_query("Russia", Some("")), "russia");
        assert_eq!(slugify_query("Russia", None), "russia");
    }

    #[test]
    fn test_slugify_query_truncates() {
        let long = "a ".repeat(100);
        let slug = slugify_query(&long, None);
        assert!(slug.len() <= SLUG_MAX_LEN);
        assert!(!slug.ends_with('_'));
    }

    #[test]
    fn test_truncate_summary_short_passthrough() {
        assert_eq!(truncate_summary("brief summary"), "brief summary");
    }

    #[test]
    fn test_truncate_summary_long() {
        let long = "x".repeat(500);
        let out = truncate_summary(&long);
        assert_eq!(out.chars().count(), SUMMARY_MAX_LEN + 1);
        assert!(out.ends_with('…'));
    }

    #[test]
    fn test_truncate_summary_multibyte_safe() {
        let long = "é".repeat(400);
        let out = truncate_summary(&long);
        assert!(out.ends_with('…'));
        assert_eq!(out.chars().count(), SUMMARY_MAX_LEN + 1);
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<p>Hello world</p>"), "Hello world");
        assert_eq!(strip_tags("no tags here"), "no tags here");
        assert_eq!(strip_tags("<strong>bold</strong> move"), "bold move");
    }

    #[test]
    fn test_parse_upstream_date_gdelt_compact() {
        let dt = parse_upstream_date("20250506143000").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-05-06T14:30:00+00:00");
    }

    #[test]
    fn test_parse_upstream_date_gdelt_hour_bucket() {
        let dt = parse_upstream_date("2025050614").unwrap();
        assert_eq!(dt.hour(), 14);
    }

    #[test]
    fn test_parse_upstream_date_rfc3339() {
        let dt = parse_upstream_date("2025-05-06T14:30:00Z").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-05-06T14:30:00+00:00");
    }

    #[test]
    fn test_parse_upstream_date_naive_iso() {
        assert!(parse_upstream_date("2025-05-06T14:30:00.123").is_some());
        assert!(parse_upstream_date("2025-05-06 14:30:00").is_some());
    }

    #[test]
    fn test_parse_upstream_date_bare_date() {
        let dt = parse_upstream_date("2025-05-06").unwrap();
        assert_eq!(dt.hour(), 0);
    }

    #[test]
    fn test_parse_upstream_date_garbage() {
        assert!(parse_upstream_date("").is_none());
        assert!(parse_upstream_date("yesterday").is_none());
        assert!(parse_upstream_date("1234").is_none());
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }
}
