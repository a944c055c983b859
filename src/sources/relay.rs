//! Relay-wrapped GDELT source.
//!
//! Third-party relay endpoints wrap the exact primary URL (percent-encoded)
//! and are walked in the configured priority order — one [`RelaySource`] per
//! endpoint, each a separate attempt. The walk is linear and unconditional:
//! no backoff, no jitter, no error classification beyond advance-on-failure.
//!
//! # Envelope unwrapping
//!
//! Relays disagree about their response envelope. Some pass the upstream body
//! through verbatim, some wrap it in `{"contents": "<json string>", ...}`,
//! and some double-encode the whole payload as one JSON string. The payload
//! must be unwrapped before the non-empty check; [`unwrap_envelope`] detects
//! all three forms.

use crate::error::FetchError;
use crate::models::Article;
use async_trait::async_trait;
use tracing::{info, instrument, warn};
use url::Url;

use super::gdelt::{build_artlist_url, parse_artlist};
use super::NewsSource;

/// One relay endpoint wrapping the primary GDELT call.
pub struct RelaySource {
    client: reqwest::Client,
    relay_prefix: String,
    api_url: String,
    max_records: usize,
}

impl RelaySource {
    pub fn new(
        client: reqwest::Client,
        relay_prefix: &str,
        api_url: &str,
        max_records: usize,
    ) -> Self {
        Self {
            client,
            relay_prefix: relay_prefix.to_string(),
            api_url: api_url.to_string(),
            max_records,
        }
    }
}

/// Undo whatever envelope the relay added around the upstream payload.
pub fn unwrap_envelope(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        // allorigins-style: real payload nested as a string under "contents".
        if let Some(contents) = value.get("contents").and_then(|v| v.as_str()) {
            return contents.to_string();
        }
        // Double-encoded: the entire body is one JSON string.
        if let serde_json::Value::String(inner) = value {
            return inner;
        }
    }
    body.to_string()
}

#[async_trait]
impl NewsSource for RelaySource {
    fn label(&self) -> String {
        let host = Url::parse(&self.relay_prefix)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| self.relay_prefix.clone());
        format!("relay:{host}")
    }

    #[instrument(level = "info", skip_all, fields(relay = %self.label(), query = %query))]
    async fn fetch(&self, query: &str, country: Option<&str>) -> Result<Vec<Article>, FetchError> {
        let target = build_artlist_url(&self.api_url, query, country, self.max_records)?;
        let wrapped = format!(
            "{}{}",
            self.relay_prefix,
            urlencoding::encode(target.as_str())
        );

        let response = self.client.get(&wrapped).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Relay returned error status");
            return Err(FetchError::Transport(format!("status {status}")));
        }

        let body = response.text().await?;
        let payload = unwrap_envelope(&body);
        let articles = parse_artlist(&payload)?;
        info!(count = articles.len(), "Fetched articles via relay");
        Ok(articles)
    }
}
