//! # hifiscout
//!
//! Searches several Swedish hifi marketplaces and dealers at once and prints
//! one merged list, newest listing first.
//!
//! ## Architecture
//!
//! ```text
//! SourceRegistry → ActiveSourceSet → Orchestrator → filter_recent → sort_by_recency
//!                                         │
//!                                ListingAdapter (per site)
//! ```
//!
//! - [`selection`]: fixed source table and include/exclude resolution
//! - [`aggregate`]: concurrent per-source search with deadlines
//! - [`dates`]: free-form Swedish/English date phrases to timestamps
//! - [`pipeline`]: recency filter and global ordering
//! - [`sources`]: the site adapters and their HTTP/Chrome page sources
//!
//! ## Quick Start
//!
//! ```bash
//! # Search the default site
//! hifiscout -s "hegel h90"
//!
//! # Two terms, every dealer except HifiTorget, last week only
//! hifiscout -s rega -s naim -e hifitorget -d 7
//! ```

/// Application context and error handling.
///
/// [`AppContext::search`](app::AppContext::search) is the single entry point
/// used by the CLI.
pub mod app;

/// Concurrent dispatch and collection.
pub mod aggregate;

/// Command-line interface using clap.
pub mod cli;

/// Configuration management.
///
/// Loads from `~/.config/hifiscout/config.toml`.
pub mod config;

/// Date phrase normalization.
pub mod dates;

/// Core domain models.
///
/// - [`Listing`](domain::Listing): one marketplace item
/// - [`SourceResult`](domain::SourceResult): listings keyed by source
/// - [`Diagnostic`](domain::Diagnostic): non-fatal problems from a run
pub mod domain;

pub mod pipeline;

/// Source registry and selection.
pub mod selection;

/// Site adapters.
///
/// - [`ListingAdapter`](sources::ListingAdapter): async trait every site implements
/// - [`PageFetcher`](sources::PageFetcher): reqwest-based page source
/// - [`BrowserSession`](sources::BrowserSession): headless Chrome page source
pub mod sources;
