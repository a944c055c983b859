//! Command-line interface definitions for newsfall.
//!
//! This module defines the CLI arguments and subcommands using the `clap`
//! crate. Global options can be provided via flags or environment variables;
//! each subcommand maps onto one pipeline operation.

use clap::{Parser, Subcommand};

/// Command-line arguments for the newsfall pipeline.
///
/// # Examples
///
/// ```sh
/// # Search worldwide, cache-first
/// newsfall search "climate change"
///
/// # Search with a source-country filter, bypassing the cache
/// newsfall search russia --country RU --no-cache
///
/// # Pre-generate the static snapshot tree
/// newsfall snapshot --output-dir ./news
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a pipeline config YAML file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Guardian API key; enables the Guardian source in the fallback chain
    #[arg(long, env = "GUARDIAN_API_KEY")]
    pub guardian_api_key: Option<String>,

    /// Directory holding the persistent cache/history state
    #[arg(long, env = "NEWSFALL_STORE_DIR")]
    pub store_dir: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve articles for a query across the fallback chain
    Search {
        /// Free-text query
        query: String,

        /// Source-country filter (ISO-ish code); omit for worldwide
        #[arg(short = 'C', long)]
        country: Option<String>,

        /// Result-count cap requested from live sources
        #[arg(long)]
        max_records: Option<usize>,

        /// Skip the cache read (fresh results are still written back)
        #[arg(long)]
        no_cache: bool,
    },

    /// Pre-generate the static snapshot tree used as the offline fallback
    Snapshot {
        /// Directory to write the tree into
        #[arg(short, long, default_value = "news")]
        output_dir: String,
    },

    /// Print the recorded search history, most recent first
    History,

    /// Fetch the news-volume timeline (synthetic series when unreachable)
    Trending {
        /// Look-back window in hours
        #[arg(long, default_value_t = 24)]
        hours: i64,
    },
}
