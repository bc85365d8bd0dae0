use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hifiscout::app::{AppContext, HifiscoutError};
use hifiscout::cli::{commands, Cli};
use hifiscout::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; RUST_LOG wins over --verbose
    let default_filter = if cli.verbose {
        "hifiscout=debug"
    } else {
        "hifiscout=warn"
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(secs) = cli.timeout {
        config.search.source_timeout_secs = secs;
    }
    let shutdown_timeout = config.search.shutdown_timeout();
    let ctx = AppContext::new(config)?;

    if cli.list_sources {
        commands::list_sources(&ctx);
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let search = commands::search(&ctx, &cli, &cancel);
    tokio::pin!(search);

    let outcome = tokio::select! {
        outcome = &mut search => outcome,
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
            match tokio::time::timeout(shutdown_timeout, &mut search).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::warn!(?shutdown_timeout, "cleanup did not finish in time");
                    Err(HifiscoutError::Cancelled)
                }
            }
        }
    };

    match outcome {
        Ok(()) => Ok(()),
        Err(HifiscoutError::Cancelled) => {
            eprintln!("\n\nSearch interrupted by user.");
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}
