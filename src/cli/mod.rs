pub mod commands;

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "hifiscout")]
#[command(
    about = "Search Swedish hifi marketplaces and dealers for used gear",
    long_about = None,
    after_help = "Results are sorted by posting date, newest first; listings without a \
                  readable date are shown last. Press Ctrl+C to cancel a running search."
)]
pub struct Cli {
    /// Search term (repeat for separate searches)
    #[arg(
        short,
        long = "search",
        value_name = "TERM",
        required_unless_present = "list_sources"
    )]
    pub search: Vec<String>,

    /// Only show listings from the last N days
    #[arg(short, long, value_name = "N")]
    pub days: Option<i64>,

    /// Search only these sites (repeatable, case-insensitive, one word of a name is enough)
    #[arg(short, long, value_name = "SITE", conflicts_with = "exclude")]
    pub include: Vec<String>,

    /// Skip these sites (repeatable)
    #[arg(short, long, value_name = "SITE")]
    pub exclude: Vec<String>,

    /// Lowest price in kronor
    #[arg(long, value_name = "KR")]
    pub min_price: Option<f64>,

    /// Highest price in kronor
    #[arg(long, value_name = "KR")]
    pub max_price: Option<f64>,

    /// Per-site search deadline in seconds (overrides the config file)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    /// List the known sites and exit
    #[arg(long)]
    pub list_sources: bool,

    /// Config file to use instead of ~/.config/hifiscout/config.toml
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log search progress to stderr
    #[arg(short, long)]
    pub verbose: bool,
}
