//! Error taxonomy for source attempts.
//!
//! Each fallback step classifies its failure so the resolver can decide both
//! whether to advance and, once every source is exhausted, which terminal
//! empty reason the caller sees:
//!
//! - [`FetchError::Transport`]: network failure, timeout, or non-2xx status
//! - [`FetchError::Decode`]: payload received but not parseable into articles
//! - [`FetchError::NotFound`]: an expected resource is absent (snapshot 404),
//!   a valid negative signal rather than a failure
//! - [`FetchError::Empty`]: source reachable and well-formed, zero matches
//!
//! `Transport` and `Decode` are always recovered locally by advancing to the
//! next source; they never surface to the caller directly.

use thiserror::Error;

/// Classified failure of a single source attempt.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Network-level failure: connection refused, timeout, or HTTP error status.
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body could not be decoded into the expected article shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// The addressed resource does not exist (e.g. snapshot 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Source answered correctly but matched no articles.
    #[error("empty result from {0}")]
    Empty(String),
}

impl FetchError {
    /// Whether the source answered at all. `NotFound` and `Empty` mean the
    /// host was reachable; only transport and decode failures leave the
    /// "anything reachable?" question open.
    pub fn source_reachable(&self) -> bool {
        matches!(self, FetchError::NotFound(_) | FetchError::Empty(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FetchError::Decode(e.to_string())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Decode(e.to_string())
    }
}
