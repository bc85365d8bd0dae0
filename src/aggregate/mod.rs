//! Concurrent dispatch and collection across the active sources.
//!
//! Every active adapter gets its own tokio task with its own deadline. A
//! source that times out, errors or panics is recorded as an empty entry
//! plus a [`Diagnostic`]; only cancellation ends the whole run early.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::app::{HifiscoutError, Result};
use crate::domain::{Diagnostic, Listing, SourceResult};
use crate::selection::ActiveSourceSet;
use crate::sources::ListingAdapter;

pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// How a single source's search ended.
#[derive(Debug)]
pub enum SourceOutcome {
    Listings(Vec<Listing>),
    TimedOut(Duration),
    Failed { kind: String, message: String },
}

impl SourceOutcome {
    fn from_join(joined: std::result::Result<SourceOutcome, JoinError>) -> Self {
        match joined {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => SourceOutcome::Failed {
                kind: "panic".into(),
                message: panic_message(e.into_panic()),
            },
            Err(e) => SourceOutcome::Failed {
                kind: "cancelled".into(),
                message: e.to_string(),
            },
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "adapter panicked".into()
    }
}

/// Listings per source plus whatever went wrong along the way.
#[derive(Debug, Default)]
pub struct Collected {
    pub results: SourceResult,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
pub struct Orchestrator {
    source_timeout: Duration,
    close_timeout: Duration,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_TIMEOUT, DEFAULT_CLOSE_TIMEOUT)
    }
}

impl Orchestrator {
    pub fn new(source_timeout: Duration, close_timeout: Duration) -> Self {
        Self {
            source_timeout,
            close_timeout,
        }
    }

    pub fn source_timeout(&self) -> Duration {
        self.source_timeout
    }

    /// Search every adapter in `active` and collect one entry per source.
    ///
    /// Returns [`HifiscoutError::Cancelled`] if `cancel` fires before
    /// collection is done. Adapter resources are released on both paths.
    pub async fn run(
        &self,
        active: &ActiveSourceSet,
        query: &str,
        min_price: Option<f64>,
        max_price: Option<f64>,
        cancel: &CancellationToken,
    ) -> Result<Collected> {
        let mut collected = Collected::default();
        if query.trim().is_empty() {
            tracing::warn!("empty search query");
            collected.diagnostics.push(Diagnostic::EmptyQuery);
        }

        // All tasks are spawned before any is awaited
        let mut handles: Vec<(String, JoinHandle<SourceOutcome>)> = active
            .adapters()
            .iter()
            .map(|adapter| {
                let name = adapter.name().to_string();
                let adapter = adapter.clone();
                let query = query.to_string();
                let deadline = self.source_timeout;
                tracing::debug!(source = %name, "dispatching search");

                let handle = tokio::spawn(async move {
                    search_one(adapter, &query, min_price, max_price, deadline).await
                });
                (name, handle)
            })
            .collect();

        let mut cancelled = false;
        for (name, handle) in handles.iter_mut() {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                joined = handle => joined,
            };

            let listings = match SourceOutcome::from_join(joined) {
                SourceOutcome::Listings(listings) => {
                    tracing::debug!(source = %name, count = listings.len(), "source finished");
                    listings
                }
                SourceOutcome::TimedOut(after) => {
                    tracing::warn!(source = %name, ?after, "source timed out");
                    collected.diagnostics.push(Diagnostic::Timeout {
                        source: name.clone(),
                        after,
                    });
                    Vec::new()
                }
                SourceOutcome::Failed { kind, message } => {
                    tracing::error!(source = %name, %kind, "source failed: {}", message);
                    collected.diagnostics.push(Diagnostic::SourceFailed {
                        source: name.clone(),
                        kind,
                        message,
                    });
                    Vec::new()
                }
            };
            collected.results.insert(name.clone(), listings);
        }

        if cancelled {
            tracing::debug!("search cancelled, aborting pending sources");
            for (_, handle) in &handles {
                handle.abort();
            }
            self.close_all(active.adapters()).await;
            return Err(HifiscoutError::Cancelled);
        }

        self.close_all(active.adapters()).await;
        Ok(collected)
    }

    /// Release every adapter's resources concurrently.
    ///
    /// Each release gets its own deadline. Failures are logged and never
    /// returned.
    pub async fn close_all(&self, adapters: &[Arc<dyn ListingAdapter>]) {
        let deadline = self.close_timeout;
        let closes = adapters.iter().map(|adapter| {
            let adapter = adapter.clone();
            let name = adapter.name().to_string();
            let handle = tokio::spawn(async move {
                tokio::time::timeout(deadline, adapter.close()).await
            });
            async move {
                match handle.await {
                    Ok(Ok(Ok(()))) => {}
                    Ok(Ok(Err(e))) => {
                        tracing::warn!(source = %name, "failed to release resources: {}", e)
                    }
                    Ok(Err(_)) => {
                        tracing::warn!(source = %name, ?deadline, "releasing resources timed out")
                    }
                    Err(e) => tracing::warn!(source = %name, "release task failed: {}", e),
                }
            }
        });

        futures::future::join_all(closes).await;
    }
}

async fn search_one(
    adapter: Arc<dyn ListingAdapter>,
    query: &str,
    min_price: Option<f64>,
    max_price: Option<f64>,
    deadline: Duration,
) -> SourceOutcome {
    if query.trim().is_empty() {
        return SourceOutcome::Listings(Vec::new());
    }

    match tokio::time::timeout(deadline, adapter.search(query, min_price, max_price)).await {
        Ok(Ok(listings)) => SourceOutcome::Listings(listings),
        Ok(Err(e)) => SourceOutcome::Failed {
            kind: e.kind().to_string(),
            message: e.to_string(),
        },
        Err(_) => SourceOutcome::TimedOut(deadline),
    }
}
