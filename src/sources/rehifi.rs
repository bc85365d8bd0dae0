//! Rehifi, a second-hand hifi shop on Starweb.
//!
//! Unlike the category-page dealers this one has a working search endpoint,
//! so queries go to the shop and only price and stock are filtered here.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::app::Result;
use crate::domain::Listing;
use crate::sources::common::PriceRange;
use crate::sources::starweb::parse_gallery;
use crate::sources::{ListingAdapter, PageSource};

const BASE_URL: &str = "https://www.rehifi.se";

const SOLD_OUT_MARKERS: [&str; 2] = ["slutsåld", "slutsald"];

pub struct Rehifi {
    pages: Arc<dyn PageSource>,
}

impl Rehifi {
    pub const NAME: &'static str = "Rehifi";
    const MAX_PAGES: u32 = 5;

    pub fn new(pages: Arc<dyn PageSource>) -> Self {
        Self { pages }
    }

    fn search_url(query: &str, page: u32) -> Result<String> {
        let mut url = Url::parse(BASE_URL)?.join("/search")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", query);
            if page > 1 {
                pairs.append_pair("page", &page.to_string());
            }
        }
        Ok(url.into())
    }

    /// Sold items stay listed with a "Slutsåld" marker in the title,
    /// description or stock status.
    fn is_sold_out(listing: &Listing) -> bool {
        let haystack = [
            Some(listing.title.as_str()),
            listing.description.as_deref(),
            listing.location.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

        SOLD_OUT_MARKERS.iter().any(|marker| haystack.contains(marker))
    }
}

#[async_trait]
impl ListingAdapter for Rehifi {
    fn name(&self) -> &str {
        Self::NAME
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

        let range = PriceRange::new(min_price, max_price);
        let mut results = Vec::new();
        let mut seen = HashSet::new();

        for page in 1..=Self::MAX_PAGES {
            let url = Self::search_url(query, page)?;
            let Some(html) = self.pages.fetch_html(&url).await? else {
                break;
            };

            let parsed = parse_gallery(&html, BASE_URL, "search");
            tracing::debug!(
                source = Self::NAME,
                page,
                found = parsed.listings.len(),
                "parsed search page"
            );
            if parsed.listings.is_empty() {
                break;
            }

            for listing in parsed.listings {
                if !range.admits(listing.price) || Self::is_sold_out(&listing) {
                    continue;
                }
                if seen.insert(listing.url.clone()) {
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
mod tests {
    use super::*;
    use crate::sources::catalog::tests::CannedPages;

    const PAGE_ONE: &str = r#"
    <ul class="gallery">
      <li class="gallery-item">
        <a class="gallery-info-link" href="/product/naim-nait-5si"><img src="/img/nait.jpg"></a>
        <div class="description"><h3>Naim Nait 5si</h3><p>Fint skick, kartong finns</p></div>
        <div class="product-price"><span class="amount">9 995 kr</span></div>
        <span class="stock-status">I lager</span>
      </li>
      <li class="gallery-item">
        <a class="gallery-info-link" href="/product/naim-cdx2"></a>
        <div class="description"><h3>Naim CDX2</h3></div>
        <div class="product-price"><span class="amount">14 500 kr</span></div>
        <span class="stock-status">Slutsåld</span>
      </li>
      <li class="gallery-item">
        <a class="gallery-info-link" href="/product/naim-flatcap"></a>
        <div class="description"><h3>Naim Flatcap 2 (slutsald)</h3></div>
        <div class="product-price"><span class="amount">2 500 kr</span></div>
      </li>
    </ul>
    <div class="pagination"><a rel="next" href="/search?q=naim&amp;page=2">»</a></div>
    "#;

    const PAGE_TWO: &str = r#"
    <ul class="gallery">
      <li class="gallery-item">
        <a class="gallery-info-link" href="/product/naim-nait-5si"></a>
        <div class="description"><h3>Naim Nait 5si</h3></div>
        <div class="product-price"><span class="amount">9 995 kr</span></div>
      </li>
      <li class="gallery-item">
        <a class="gallery-info-link" href="/product/naim-hicap"></a>
        <div class="description"><h3>Naim Hicap</h3></div>
        <div class="product-price"><span class="amount">6 000 kr</span></div>
      </li>
    </ul>
    "#;

    fn pages() -> Arc<CannedPages> {
        Arc::new(
            CannedPages::default()
                .with("https://www.rehifi.se/search?q=naim", PAGE_ONE)
                .with("https://www.rehifi.se/search?q=naim&page=2", PAGE_TWO),
        )
    }

    #[test]
    fn test_search_urls() {
        assert_eq!(
            Rehifi::search_url("naim nait", 1).unwrap(),
            "https://www.rehifi.se/search?q=naim+nait"
        );
        assert_eq!(
            Rehifi::search_url("naim", 3).unwrap(),
            "https://www.rehifi.se/search?q=naim&page=3"
        );
    }

    #[test]
    fn test_parse_search_page() {
        let page = parse_gallery(PAGE_ONE, BASE_URL, "search");
        assert!(page.has_next);
        assert_eq!(page.listings.len(), 3);

        let nait = &page.listings[0];
        assert_eq!(nait.title, "Naim Nait 5si");
        assert_eq!(nait.url, "https://www.rehifi.se/product/naim-nait-5si");
        assert_eq!(nait.price, Some(9995.0));
        assert_eq!(nait.description.as_deref(), Some("Fint skick, kartong finns"));
        assert_eq!(nait.image_url.as_deref(), Some("https://www.rehifi.se/img/nait.jpg"));

        assert!(!Rehifi::is_sold_out(nait));
        assert!(Rehifi::is_sold_out(&page.listings[1]));
        assert!(Rehifi::is_sold_out(&page.listings[2]));
    }

    #[tokio::test]
    async fn test_search_drops_sold_out_and_duplicates() {
        let pages = pages();
        let adapter = Rehifi::new(pages.clone());

        let results = adapter.search("naim", None, None).await.unwrap();
        let titles: Vec<_> = results.iter().map(|l| l.title.as_str()).collect();

        assert_eq!(titles, vec!["Naim Nait 5si", "Naim Hicap"]);
        assert_eq!(pages.requested.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_search_applies_price_range() {
        let adapter = Rehifi::new(pages());

        let results = adapter.search("naim", Some(7000.0), None).await.unwrap();
        let titles: Vec<_> = results.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["Naim Nait 5si"]);
    }

    #[tokio::test]
    async fn test_blank_query_fetches_nothing() {
        let pages = pages();
        let adapter = Rehifi::new(pages.clone());

        assert!(adapter.search("  ", None, None).await.unwrap().is_empty());
        assert!(pages.requested.lock().unwrap().is_empty());
    }
}
