use chrono::Local;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::aggregate::Orchestrator;
use crate::app::error::Result;
use crate::config::Config;
use crate::domain::{Diagnostic, RankedListing};
use crate::pipeline::{filter_recent, sort_by_recency};
use crate::selection::{SourceRegistry, SourceSelection};
use crate::sources::default_adapters;

/// One query as asked by the caller.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub query: String,
    /// Drop listings older than this many days. `None` or `<= 0` keeps all.
    pub max_age_days: Option<i64>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceCount {
    pub source: String,
    pub count: usize,
}

/// Everything a search run produced, ready for presentation.
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age_days: Option<i64>,
    pub listings: Vec<RankedListing>,
    pub diagnostics: Vec<Diagnostic>,
    /// Listings per source after filtering, in activation order.
    pub per_source_counts: Vec<SourceCount>,
}

impl SearchReport {
    pub fn total(&self) -> usize {
        self.listings.len()
    }
}

pub struct AppContext {
    pub config: Config,
    pub registry: SourceRegistry,
    orchestrator: Orchestrator,
}

impl AppContext {
    /// Build the context with the built-in source table.
    pub fn new(config: Config) -> Result<Self> {
        let adapters = default_adapters(&config.http, &config.browser)?;
        Ok(Self::with_registry(config, SourceRegistry::new(adapters)))
    }

    pub fn with_registry(config: Config, registry: SourceRegistry) -> Self {
        let orchestrator = Orchestrator::new(
            config.search.source_timeout(),
            config.search.close_timeout(),
        );

        Self {
            config,
            registry,
            orchestrator,
        }
    }

    /// Run one query across the selected sources.
    ///
    /// Conflicting include and exclude lists fail before any source is
    /// touched. Per-source problems come back as diagnostics; only
    /// cancellation and misconfiguration return an error.
    pub async fn search(
        &self,
        request: &SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<SearchReport> {
        let selection = SourceSelection::from_flags(
            &request.include,
            &request.exclude,
            &self.config.default_sources,
        )?;
        let active = self.registry.resolve(&selection);
        let mut diagnostics = self.registry.diagnostics(&active);

        tracing::debug!(
            query = %request.query,
            sources = ?active.names(),
            "starting search"
        );

        let collected = self
            .orchestrator
            .run(
                &active,
                &request.query,
                request.min_price,
                request.max_price,
                cancel,
            )
            .await?;
        diagnostics.extend(collected.diagnostics);

        let now = Local::now().naive_local();
        let mut results = collected.results;
        if let Some(days) = request.max_age_days {
            results = filter_recent(results, days, now);
        }

        let per_source_counts = results
            .iter()
            .map(|entry| SourceCount {
                source: entry.source.clone(),
                count: entry.listings.len(),
            })
            .collect();

        Ok(SearchReport {
            query: request.query.clone(),
            max_age_days: request.max_age_days,
            listings: sort_by_recency(results, now),
            diagnostics,
            per_source_counts,
        })
    }
}
