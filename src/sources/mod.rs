//! Article sources for the fallback chain.
//!
//! Each source maps its upstream shape onto the normalized [`Article`]
//! contract and classifies its own failures; the resolver walks them in
//! priority order. A source returning an empty list is a valid outcome — the
//! resolver, not the source, decides that an empty list means "advance".
//!
//! # Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | GDELT DOC | [`gdelt`] | live API | primary; also serves the volume timeline |
//! | Relays | [`relay`] | live API via proxy | wrap the GDELT URL; may double-encode the payload |
//! | The Guardian | [`guardian`] | live API | secondary; requires an API key |
//! | Snapshots | [`snapshot`] | static JSON | slug-addressed, with a generic "latest" fallback |
//!
//! # Common Patterns
//!
//! Every source exposes a [`NewsSource`] implementation:
//! - `label()`: stable identifier recorded in cache entries and logs
//! - `fetch(query, country)`: normalized articles or a classified [`FetchError`]
//!
//! Failures are never raised past the resolver; they advance the chain.

use crate::error::FetchError;
use crate::models::Article;
use async_trait::async_trait;

pub mod gdelt;
pub mod guardian;
pub mod relay;
pub mod snapshot;

/// A single attempt in the resolver's priority list.
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Stable label identifying this source (e.g. `"gdelt"`,
    /// `"relay:api.allorigins.win"`).
    fn label(&self) -> String;

    /// Fetch and normalize articles for a query and optional country filter.
    ///
    /// An `Ok` list may be empty; errors are classified, never raised to the
    /// pipeline caller.
    async fn fetch(&self, query: &str, country: Option<&str>) -> Result<Vec<Article>, FetchError>;
}
