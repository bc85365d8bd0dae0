use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::domain::Listing;
use crate::sources::catalog::{CatalogPage, CatalogSite};
use crate::sources::common::{extract_price, first_attr, non_empty_text, resolve_url};

const BASE_URL: &str = "https://taktoton.com";

static PRODUCT: Lazy<Selector> = Lazy::new(|| Selector::parse("li.product-item").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a.product-item-link").unwrap());
static PRICE: Lazy<Selector> = Lazy::new(|| Selector::parse("span.price").unwrap());
static IMAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("img.product-image-photo").unwrap());
static DISCOUNT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".product-item-discount").unwrap());
static NEXT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".pages a.next, .pages a[title*='Nästa']").unwrap());

/// Taktoton "Begagnat" category (Magento 2).
pub struct Taktoton;

impl Taktoton {
    fn parse_product(node: ElementRef<'_>) -> Option<Listing> {
        let link = node.select(&LINK).next()?;
        let title = non_empty_text(link)?;
        let url = link
            .value()
            .attr("href")
            .and_then(|href| resolve_url(BASE_URL, href))?;

        let mut listing = Listing::new(title, url).with_metadata("source", "taktoton_begagnat");
        listing.price = node
            .select(&PRICE)
            .next()
            .and_then(non_empty_text)
            .and_then(|text| extract_price(&text));
        listing.image_url = node
            .select(&IMAGE)
            .next()
            .and_then(|img| first_attr(img, &["src", "data-src"]));
        // The discount badge is the only free text Magento shows in the grid
        listing.description = node.select(&DISCOUNT).next().and_then(non_empty_text);

        Some(listing)
    }
}

impl CatalogSite for Taktoton {
    const NAME: &'static str = "Taktoton";
    const MAX_PAGES: u32 = 10;

    fn page_url(&self, page: u32) -> String {
        if page <= 1 {
            format!("{}/begagnat", BASE_URL)
        } else {
            format!("{}/begagnat?p={}", BASE_URL, page)
        }
    }

    fn parse_page(&self, html: &str, _page: u32) -> CatalogPage {
        let document = Html::parse_document(html);
        let listings = document
            .select(&PRODUCT)
            .filter_map(Self::parse_product)
            .collect();
        let has_next = document.select(&NEXT).next().is_some();

        CatalogPage { listings, has_next }
    }
}
