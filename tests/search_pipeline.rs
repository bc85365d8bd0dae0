use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use hifiscout::app::{AppContext, HifiscoutError, Result, SearchRequest};
use hifiscout::config::Config;
use hifiscout::domain::{Diagnostic, Listing};
use hifiscout::selection::SourceRegistry;
use hifiscout::sources::ListingAdapter;

#[derive(Clone, Copy)]
enum Mode {
    Listings(&'static [(&'static str, Option<&'static str>)]),
    Fail,
    Stall,
    Panic,
}

struct Spy {
    name: &'static str,
    mode: Mode,
    searches: AtomicUsize,
    closes: AtomicUsize,
}

impl Spy {
    fn new(name: &'static str, mode: Mode) -> Arc<Self> {
        Arc::new(Self {
            name,
            mode,
            searches: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        })
    }

    fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ListingAdapter for Spy {
    fn name(&self) -> &str {
        self.name
    }

    async fn search(
        &self,
        _query: &str,
        _min_price: Option<f64>,
        _max_price: Option<f64>,
    ) -> Result<Vec<Listing>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            Mode::Listings(items) => Ok(items
                .iter()
                .map(|(title, date)| {
                    let listing = Listing::new(*title, format!("https://x.example/{}", title));
                    match date {
                        Some(date) => listing.with_posted_date(*date),
                        None => listing,
                    }
                })
                .collect()),
            Mode::Fail => Err(HifiscoutError::Browser("chrome crashed".into())),
            Mode::Stall => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
            Mode::Panic => panic!("unexpected markup"),
        }
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn context(spies: &[Arc<Spy>], default_sources: &[&str]) -> AppContext {
    context_with_timeout(spies, default_sources, 1)
}

fn context_with_timeout(
    spies: &[Arc<Spy>],
    default_sources: &[&str],
    source_timeout_secs: u64,
) -> AppContext {
    let mut config = Config::default();
    config.default_sources = default_sources.iter().map(|s| s.to_string()).collect();
    config.search.source_timeout_secs = source_timeout_secs;
    config.search.close_timeout_secs = 1;

    let adapters: Vec<Arc<dyn ListingAdapter>> = spies
        .iter()
        .map(|spy| spy.clone() as Arc<dyn ListingAdapter>)
        .collect();
    AppContext::with_registry(config, SourceRegistry::new(adapters))
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_merges_sources_newest_first() {
    let dealer = Spy::new(
        "HiFi Puls",
        Mode::Listings(&[("Hegel H90", None), ("Hegel H190", Some("2 dagar sedan"))]),
    );
    let market = Spy::new(
        "HifiTorget",
        Mode::Listings(&[("Hegel H95", Some("idag")), ("Hegel H360", Some("not a date"))]),
    );
    let ctx = context(&[dealer.clone(), market.clone()], &[]);

    let report = ctx
        .search(&SearchRequest::new("hegel"), &CancellationToken::new())
        .await
        .unwrap();

    let order: Vec<_> = report
        .listings
        .iter()
        .map(|r| (r.source.as_str(), r.listing.title.as_str()))
        .collect();
    assert_eq!(
        order,
        vec![
            ("HifiTorget", "Hegel H95"),
            ("HiFi Puls", "Hegel H190"),
            ("HiFi Puls", "Hegel H90"),
            ("HifiTorget", "Hegel H360"),
        ]
    );
    assert!(report.diagnostics.is_empty());
    assert_eq!(dealer.closes(), 1);
    assert_eq!(market.closes(), 1);
}

#[tokio::test]
async fn test_failures_are_isolated_per_source() {
    let ok = Spy::new("Taktoton", Mode::Listings(&[("Rega Planar 3", None)]));
    let failing = Spy::new("Perfect Sense", Mode::Fail);
    let stalling = Spy::new("HiFi Experience", Mode::Stall);
    let panicking = Spy::new("AudioPerformance", Mode::Panic);
    let ctx = context(
        &[ok.clone(), failing.clone(), stalling.clone(), panicking.clone()],
        &[],
    );

    let started = Instant::now();
    let report = ctx
        .search(&SearchRequest::new("rega"), &CancellationToken::new())
        .await
        .unwrap();

    // Deadlines run side by side, not one after another
    assert!(started.elapsed() < Duration::from_secs(3));

    let counts: Vec<_> = report
        .per_source_counts
        .iter()
        .map(|c| (c.source.as_str(), c.count))
        .collect();
    assert_eq!(
        counts,
        vec![
            ("Taktoton", 1),
            ("Perfect Sense", 0),
            ("HiFi Experience", 0),
            ("AudioPerformance", 0),
        ]
    );
    assert_eq!(report.listings.len(), 1);

    assert!(report.diagnostics.contains(&Diagnostic::SourceFailed {
        source: "Perfect Sense".into(),
        kind: "browser".into(),
        message: "Browser error: chrome crashed".into(),
    }));
    assert!(report.diagnostics.contains(&Diagnostic::Timeout {
        source: "HiFi Experience".into(),
        after: Duration::from_secs(1),
    }));
    assert!(report
        .diagnostics
        .iter()
        .any(|d| d.source() == Some("AudioPerformance")));

    for spy in [&ok, &failing, &stalling, &panicking] {
        assert_eq!(spy.closes(), 1);
    }
}

#[tokio::test]
async fn test_include_and_exclude_rejected_before_any_search() {
    let spy = Spy::new("HifiTorget", Mode::Listings(&[]));
    let ctx = context(&[spy.clone()], &[]);

    let request = SearchRequest {
        include: strings(&["hifitorget"]),
        exclude: strings(&["puls"]),
        ..SearchRequest::new("hegel")
    };
    let result = ctx.search(&request, &CancellationToken::new()).await;

    assert!(matches!(result, Err(HifiscoutError::ConflictingSourceFilters)));
    assert_eq!(spy.searches(), 0);
    assert_eq!(spy.closes(), 0);
}

#[tokio::test]
async fn test_default_sources_and_unknown_tokens() {
    let market = Spy::new("HifiTorget", Mode::Listings(&[("Naim Nait", None)]));
    let dealer = Spy::new("HiFi Puls", Mode::Listings(&[("Naim Uniti", None)]));
    let ctx = context(&[market.clone(), dealer.clone()], &["HifiTorget"]);

    let report = ctx
        .search(&SearchRequest::new("naim"), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(market.searches(), 1);
    assert_eq!(dealer.searches(), 0);
    assert_eq!(report.listings.len(), 1);

    let request = SearchRequest {
        include: strings(&["puls", "blocket"]),
        ..SearchRequest::new("naim")
    };
    let report = ctx
        .search(&request, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(dealer.searches(), 1);
    assert_eq!(report.listings[0].source, "HiFi Puls");
    assert_eq!(
        report.diagnostics,
        vec![Diagnostic::UnrecognizedSource {
            token: "blocket".into(),
            available: strings(&["HifiTorget", "HiFi Puls"]),
        }]
    );
}

#[tokio::test]
async fn test_recency_filter_applies_to_report() {
    let spy = Spy::new(
        "HifiTorget",
        Mode::Listings(&[
            ("fresh", Some("1 timme sedan")),
            ("old", Some("2019-03-01")),
            ("undated", None),
        ]),
    );
    let ctx = context(&[spy], &[]);

    let request = SearchRequest {
        max_age_days: Some(7),
        ..SearchRequest::new("anything")
    };
    let report = ctx
        .search(&request, &CancellationToken::new())
        .await
        .unwrap();

    let titles: Vec<_> = report
        .listings
        .iter()
        .map(|r| r.listing.title.as_str())
        .collect();
    assert_eq!(titles, vec!["fresh", "undated"]);
    assert_eq!(report.per_source_counts[0].count, 2);
}

#[tokio::test]
async fn test_cancellation_ends_run_and_cleans_up() {
    let stalling = Spy::new("HifiTorget", Mode::Stall);
    let ctx = context_with_timeout(&[stalling.clone()], &[], 3600);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let result = ctx.search(&SearchRequest::new("hegel"), &cancel).await;

    assert!(matches!(result, Err(HifiscoutError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(stalling.closes(), 1);
}
