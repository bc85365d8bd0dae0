//! Marketplace adapters.
//!
//! Each source is one [`ListingAdapter`] implementation. The aggregation
//! core only ever sees the trait; how a source finds its listings (search
//! endpoint, paginated category page, rendered page) stays in here.
//!
//! ```text
//! query → ListingAdapter::search → PageSource (HTTP | Chrome) → HTML → Vec<Listing>
//! ```

mod audioperformance;
mod browser;
mod catalog;
mod common;
mod hifiexperience;
mod hifipuls;
mod hifitorget;
mod http;
mod perfectsense;
mod rehifi;
mod starweb;
mod taktoton;

pub use audioperformance::AudioPerformance;
pub use browser::{BrowserConfig, BrowserSession};
pub use catalog::{CatalogAdapter, CatalogPage, CatalogSite};
pub use common::{extract_price, resolve_url, PriceRange, QueryMatcher};
pub use hifiexperience::HifiExperience;
pub use hifipuls::HifiPuls;
pub use hifitorget::HifiTorget;
pub use http::{HttpConfig, PageFetcher};
pub use perfectsense::PerfectSense;
pub use rehifi::Rehifi;
pub use taktoton::Taktoton;

use std::sync::Arc;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::Listing;

/// Capability every marketplace source provides.
#[async_trait]
pub trait ListingAdapter: Send + Sync {
    /// Stable name, used as the result key and for include/exclude matching.
    fn name(&self) -> &str;

    /// Search the source for `query`.
    ///
    /// May fail or stall; callers bound it with their own deadline.
    async fn search(
        &self,
        query: &str,
        min_price: Option<f64>,
        max_price: Option<f64>,
    ) -> Result<Vec<Listing>>;

    /// Release any held session. Must be idempotent and safe to call on an
    /// adapter that never opened one.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Where an adapter gets its HTML from.
///
/// Returns `Ok(None)` when the page does not exist.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_html(&self, url: &str) -> Result<Option<String>>;

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Pick the page source for a site: headless Chrome when the site is listed
/// in the browser config, plain HTTP otherwise.
pub fn page_source_for(
    site: &str,
    fetcher: &Arc<PageFetcher>,
    browser: &BrowserConfig,
) -> Arc<dyn PageSource> {
    if browser.renders(site) {
        return Arc::new(BrowserSession::new(browser.clone()));
    }
    fetcher.clone()
}

/// The fixed table of known sources, in registry order.
pub fn default_adapters(
    http: &HttpConfig,
    browser: &BrowserConfig,
) -> Result<Vec<Arc<dyn ListingAdapter>>> {
    let fetcher = Arc::new(PageFetcher::new(http)?);
    let pages = |site: &str| page_source_for(site, &fetcher, browser);

    let adapters: Vec<Arc<dyn ListingAdapter>> = vec![
        Arc::new(HifiTorget::new(pages(HifiTorget::NAME))),
        Arc::new(CatalogAdapter::new(HifiPuls, pages(HifiPuls::NAME))),
        Arc::new(CatalogAdapter::new(Taktoton, pages(Taktoton::NAME))),
        Arc::new(CatalogAdapter::new(HifiExperience, pages(HifiExperience::NAME))),
        Arc::new(CatalogAdapter::new(AudioPerformance, pages(AudioPerformance::NAME))),
        Arc::new(CatalogAdapter::new(PerfectSense, pages(PerfectSense::NAME))),
        Arc::new(Rehifi::new(pages(Rehifi::NAME))),
    ];

    Ok(adapters)
}
