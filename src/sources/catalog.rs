use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::Listing;
use crate::sources::common::{PriceRange, QueryMatcher};
use crate::sources::{ListingAdapter, PageSource};

/// One parsed page of a category listing.
#[derive(Debug, Clone, Default)]
pub struct CatalogPage {
    pub listings: Vec<Listing>,
    pub has_next: bool,
}

/// A shop that exposes its used gear as a paginated category page rather
/// than a search endpoint. Queries are matched locally.
pub trait CatalogSite: Send + Sync + 'static {
    const NAME: &'static str;
    const MAX_PAGES: u32;

    fn page_url(&self, page: u32) -> String;

    /// Parse the HTML of page number `page` (1-based).
    fn parse_page(&self, html: &str, page: u32) -> CatalogPage;

    fn matches(&self, listing: &Listing, query: &QueryMatcher) -> bool {
        let haystack = format!(
            "{} {}",
            listing.title,
            listing.description.as_deref().unwrap_or_default()
        );
        query.matches_words(&haystack)
    }

    fn dedup_key(&self, listing: &Listing) -> String {
        listing.url.clone()
    }
}

/// Walks a [`CatalogSite`] page by page and filters what it finds.
pub struct CatalogAdapter<S: CatalogSite> {
    site: S,
    pages: Arc<dyn PageSource>,
}

impl<S: CatalogSite> CatalogAdapter<S> {
    pub fn new(site: S, pages: Arc<dyn PageSource>) -> Self {
        Self { site, pages }
    }
}

#[async_trait]
impl<S: CatalogSite> ListingAdapter for CatalogAdapter<S> {
    fn name(&self) -> &str {
        S::NAME
    }

    async fn search(
        &self,
        query: &str,
        min_price: Option<f64>,
        max_price: Option<f64>,
    ) -> Result<Vec<Listing>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let matcher = QueryMatcher::new(query);
        let range = PriceRange::new(min_price, max_price);
        let mut results = Vec::new();
        let mut seen = HashSet::new();

        for page in 1..=S::MAX_PAGES {
            let url = self.site.page_url(page);
            let Some(html) = self.pages.fetch_html(&url).await? else {
                break;
            };

            let parsed = self.site.parse_page(&html, page);
            tracing::debug!(
                source = S::NAME,
                page,
                found = parsed.listings.len(),
                "parsed catalog page"
            );
            if parsed.listings.is_empty() {
                break;
            }

            for listing in parsed.listings {
                if !self.site.matches(&listing, &matcher) || !range.admits(listing.price) {
                    continue;
                }
                if seen.insert(self.site.dedup_key(&listing)) {
                    results.push(listing);
                }
            }

            if !parsed.has_next {
                break;
            }
        }

        Ok(results)
    }

    async fn close(&self) -> Result<()> {
        self.pages.close().await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// Serves canned HTML by URL and records every request.
    #[derive(Default)]
    pub(crate) struct CannedPages {
        pages: HashMap<String, String>,
        pub(crate) requested: Mutex<Vec<String>>,
    }

    impl CannedPages {
        pub(crate) fn with(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), html.to_string());
            self
        }
    }

    #[async_trait]
    impl PageSource for CannedPages {
        async fn fetch_html(&self, url: &str) -> Result<Option<String>> {
            self.requested.lock().unwrap().push(url.to_string());
            Ok(self.pages.get(url).cloned())
        }
    }

    struct ToySite;

    impl CatalogSite for ToySite {
        const NAME: &'static str = "Toy";
        const MAX_PAGES: u32 = 3;

        fn page_url(&self, page: u32) -> String {
            format!("https://toy.example/p{}", page)
        }

        fn parse_page(&self, html: &str, _page: u32) -> CatalogPage {
            let mut listings = Vec::new();
            let mut has_next = false;
            for line in html.lines().map(str::trim).filter(|l| !l.is_empty()) {
                if line == "NEXT" {
                    has_next = true;
                    continue;
                }
                let (title, price) = line.split_once('|').unwrap();
                let mut listing = Listing::new(title, format!("https://toy.example/{}", title));
                listing.price = price.parse().ok();
                listings.push(listing);
            }
            CatalogPage { listings, has_next }
        }
    }

    fn toy_pages() -> Arc<CannedPages> {
        Arc::new(
            CannedPages::default()
                .with("https://toy.example/p1", "Hegel H90|9000\nRega Planar|3000\nNEXT")
                .with("https://toy.example/p2", "Hegel H190|15000\nHegel H90|9000\nNEXT")
                .with("https://toy.example/p3", "Hegel H390|\n"),
        )
    }

    #[tokio::test]
    async fn test_walks_pages_and_filters_by_query() {
        let pages = toy_pages();
        let adapter = CatalogAdapter::new(ToySite, pages.clone());

        let results = adapter.search("hegel", None, None).await.unwrap();
        let titles: Vec<_> = results.iter().map(|l| l.title.as_str()).collect();

        // Duplicate H90 on page 2 is dropped, page 3 is the last allowed
        assert_eq!(titles, vec!["Hegel H90", "Hegel H190", "Hegel H390"]);
        assert_eq!(pages.requested.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_price_range_keeps_unknown_prices() {
        let adapter = CatalogAdapter::new(ToySite, toy_pages());

        let results = adapter.search("hegel", Some(10000.0), None).await.unwrap();
        let titles: Vec<_> = results.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["Hegel H190", "Hegel H390"]);
    }

    #[tokio::test]
    async fn test_missing_page_stops_walk() {
        let pages = Arc::new(
            CannedPages::default().with("https://toy.example/p1", "Hegel H90|9000\nNEXT"),
        );
        let adapter = CatalogAdapter::new(ToySite, pages.clone());

        let results = adapter.search("hegel", None, None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(pages.requested.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_blank_query_fetches_nothing() {
        let pages = toy_pages();
        let adapter = CatalogAdapter::new(ToySite, pages.clone());

        let results = adapter.search("   ", None, None).await.unwrap();
        assert!(results.is_empty());
        assert!(pages.requested.lock().unwrap().is_empty());
    }
}
