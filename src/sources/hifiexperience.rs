use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::domain::Listing;
use crate::sources::catalog::{CatalogPage, CatalogSite};
use crate::sources::common::{
    element_text, extract_price, first_attr, non_empty_text, resolve_url, QueryMatcher,
};

const BASE_URL: &str = "https://www.hifiexperience.se";

static PRODUCT: Lazy<Selector> = Lazy::new(|| Selector::parse("ul.products li.product").unwrap());
static LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.woocommerce-LoopProduct-link").unwrap());
static TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".woocommerce-loop-product__title").unwrap());
static PRICE: Lazy<Selector> = Lazy::new(|| Selector::parse(".price").unwrap());
static SALE_AMOUNT: Lazy<Selector> = Lazy::new(|| Selector::parse("ins .amount").unwrap());
static AMOUNT: Lazy<Selector> = Lazy::new(|| Selector::parse(".amount").unwrap());
static IMAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());
static PAGE_NUMBERS: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".page-numbers a, .page-numbers span").unwrap());

/// HiFi Experience "Begagnad HiFi" category (WooCommerce).
pub struct HifiExperience;

impl HifiExperience {
    fn category_url() -> String {
        format!("{}/produktkategori/begagnad-hifi/", BASE_URL)
    }

    fn parse_product(node: ElementRef<'_>) -> Option<Listing> {
        let link = node.select(&LINK).next()?;
        let title = node.select(&TITLE).next().and_then(non_empty_text)?;
        let url = link
            .value()
            .attr("href")
            .and_then(|href| resolve_url(BASE_URL, href))?;

        let mut listing = Listing::new(title, url).with_metadata("source", "category_page");
        listing.price = node.select(&PRICE).next().and_then(|wrapper| {
            // A sale shows the old price struck out and the current one in <ins>
            let amount = wrapper
                .select(&SALE_AMOUNT)
                .next()
                .or_else(|| wrapper.select(&AMOUNT).next())
                .unwrap_or(wrapper);
            extract_price(&element_text(amount))
        });
        listing.image_url = node
            .select(&IMAGE)
            .next()
            .and_then(|img| first_attr(img, &["src"]));

        Some(listing)
    }

    /// Highest page number shown in the pagination block.
    fn last_page(document: &Html) -> Option<u32> {
        document
            .select(&PAGE_NUMBERS)
            .filter_map(|el| element_text(el).parse::<u32>().ok())
            .max()
    }
}

impl CatalogSite for HifiExperience {
    const NAME: &'static str = "HiFi Experience";
    const MAX_PAGES: u32 = 10;

    fn page_url(&self, page: u32) -> String {
        if page <= 1 {
            Self::category_url()
        } else {
            format!("{}page/{}/", Self::category_url(), page)
        }
    }

    fn parse_page(&self, html: &str, page: u32) -> CatalogPage {
        let document = Html::parse_document(html);
        let listings = document
            .select(&PRODUCT)
            .filter_map(Self::parse_product)
            .collect();
        // Without pagination markup keep walking until a page comes back empty
        let has_next = Self::last_page(&document).is_none_or(|last| page < last);

        CatalogPage { listings, has_next }
    }

    fn matches(&self, listing: &Listing, query: &QueryMatcher) -> bool {
        query.matches_words(&listing.title)
    }
}
