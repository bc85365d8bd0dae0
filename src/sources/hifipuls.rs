use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::domain::Listing;
use crate::sources::catalog::{CatalogPage, CatalogSite};
use crate::sources::common::{extract_price, first_attr, non_empty_text, resolve_url};

const BASE_URL: &str = "https://www.hifipuls.se";

static PRODUCT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("ul.product_list li.ajax_block_product").unwrap());
static TITLE_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse(".product-name").unwrap());
static PRICE: Lazy<Selector> = Lazy::new(|| Selector::parse(".product-price").unwrap());
static DESCRIPTION: Lazy<Selector> = Lazy::new(|| Selector::parse(".product-desc").unwrap());
static STOCK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".availability, .product-reference").unwrap());
static IMAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".product-image-container img").unwrap());
static NEXT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".pagination_next a, .pagination .next a").unwrap());

/// HiFi Puls "Demo & Begagnat" category (PrestaShop).
pub struct HifiPuls;

impl HifiPuls {
    fn category_url() -> String {
        format!("{}/114-demo-begagnat", BASE_URL)
    }

    fn parse_product(node: ElementRef<'_>) -> Option<Listing> {
        let link = node.select(&TITLE_LINK).next()?;
        let title = non_empty_text(link)?;
        let url = link
            .value()
            .attr("href")
            .and_then(|href| resolve_url(BASE_URL, href))
            .unwrap_or_else(Self::category_url);

        let mut listing = Listing::new(title, url).with_metadata("source", "hifipuls");
        listing.price = node
            .select(&PRICE)
            .next()
            .and_then(non_empty_text)
            .and_then(|text| extract_price(&text));
        listing.description = node.select(&DESCRIPTION).next().and_then(non_empty_text);
        listing.location = node.select(&STOCK).next().and_then(non_empty_text);
        listing.image_url = node
            .select(&IMAGE)
            .next()
            .and_then(|img| first_attr(img, &["data-original", "src"]))
            .and_then(|src| resolve_url(BASE_URL, &src));

        Some(listing)
    }
}

impl CatalogSite for HifiPuls {
    const NAME: &'static str = "HiFi Puls";
    const MAX_PAGES: u32 = 5;

    fn page_url(&self, page: u32) -> String {
        if page <= 1 {
            Self::category_url()
        } else {
            format!("{}?p={}", Self::category_url(), page)
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
