use crate::domain::Listing;
use crate::sources::catalog::{CatalogPage, CatalogSite};
use crate::sources::common::QueryMatcher;
use crate::sources::starweb::parse_gallery;

const BASE_URL: &str = "https://www.audioperformance.se";

/// AudioPerformance "Begagnad HiFi" category.
pub struct AudioPerformance;

impl CatalogSite for AudioPerformance {
    const NAME: &'static str = "AudioPerformance";
    const MAX_PAGES: u32 = 10;

    fn page_url(&self, page: u32) -> String {
        if page <= 1 {
            format!("{}/category/begagnad-hifi", BASE_URL)
        } else {
            format!("{}/category/begagnad-hifi?page={}", BASE_URL, page)
        }
    }

    fn parse_page(&self, html: &str, _page: u32) -> CatalogPage {
        parse_gallery(html, BASE_URL, "category_page")
    }

    /// Substring match; model names here are often glued to suffixes.
    fn matches(&self, listing: &Listing, query: &QueryMatcher) -> bool {
        let haystack = format!(
            "{} {}",
            listing.title,
            listing.description.as_deref().unwrap_or_default()
        );
        query.contained_in(&haystack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
    <ul class="gallery">
      <li class="gallery-item">
        <a class="gallery-info-link" href="/product/musical-fidelity-m6si"><img data-src="/images/m6si.jpg"></a>
        <div class="description">
          <h3>Musical Fidelity M6si</h3>
          <span class="product-sku">Art.nr 12345</span>
        </div>
        <div class="product-price"><span class="amount">12 900 kr</span></div>
        <span class="stock-status">Finns i butik</span>
      </li>
    </ul>
    <div class="pagination">
      <a class="prev disabled">«</a>
      <a class="next disabled">»</a>
    </div>
    "#;

    #[test]
    fn test_parse_page() {
        let page = AudioPerformance.parse_page(PAGE, 1);
        assert!(!page.has_next);
        assert_eq!(page.listings.len(), 1);

        let listing = &page.listings[0];
        assert_eq!(listing.title, "Musical Fidelity M6si");
        assert_eq!(
            listing.url,
            "https://www.audioperformance.se/product/musical-fidelity-m6si"
        );
        assert_eq!(listing.price, Some(12900.0));
        assert_eq!(listing.description.as_deref(), Some("Art.nr 12345"));
        assert_eq!(listing.location.as_deref(), Some("Finns i butik"));
        assert_eq!(
            listing.image_url.as_deref(),
            Some("https://www.audioperformance.se/images/m6si.jpg")
        );
        assert_eq!(
            listing.source_metadata.get("source").map(String::as_str),
            Some("category_page")
        );
    }

    #[test]
    fn test_enabled_next_link() {
        let html = r#"<div class="pagination"><a rel="next" href="?page=2">»</a></div>"#;
        assert!(AudioPerformance.parse_page(html, 1).has_next);
    }

    #[test]
    fn test_substring_matching() {
        let listing = Listing::new("Musical Fidelity M6si", "u");
        assert!(AudioPerformance.matches(&listing, &QueryMatcher::new("m6")));
        assert!(!AudioPerformance.matches(&listing, &QueryMatcher::new("naim")));
    }
}
