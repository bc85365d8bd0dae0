use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::domain::Listing;
use crate::sources::catalog::{CatalogPage, CatalogSite};
use crate::sources::common::{
    collapse_whitespace, extract_price, first_attr, non_empty_text, resolve_url, truncate_chars,
};

const BASE_URL: &str = "https://perfect-sense.se";

static PRODUCT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.one_third, div.one_third_first").unwrap());
static HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse("h3").unwrap());
static IMAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());
static PRICE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Pris:\s*([\d\s.,]+)\s*kr").unwrap());
static DESCRIPTION_END_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Pris:|Mer information").unwrap());

/// Perfect Sense demo and trade-in page. Everything sits on one page and
/// items have no pages of their own.
pub struct PerfectSense;

impl PerfectSense {
    fn category_url() -> String {
        format!("{}/demo-inbyten-andra-hand", BASE_URL)
    }

    fn parse_product(node: ElementRef<'_>) -> Option<Listing> {
        let title = node.select(&HEADING).next().and_then(non_empty_text)?;
        if title.to_lowercase().contains("sålda") {
            return None;
        }

        let lines: Vec<&str> = node
            .text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        let flat = lines.join(" ");

        let mut listing =
            Listing::new(title.clone(), Self::category_url()).with_metadata("source", "perfect_sense_demo");
        listing.price = PRICE_RE
            .captures(&flat)
            .and_then(|caps| extract_price(&caps[1]));
        listing.image_url = node
            .select(&IMAGE)
            .next()
            .and_then(|img| first_attr(img, &["src", "data-src"]))
            .and_then(|src| resolve_url(BASE_URL, &src));
        listing.description = flat
            .split_once(title.as_str())
            .and_then(|(_, after)| DESCRIPTION_END_RE.split(after).next())
            .map(collapse_whitespace)
            .filter(|d| !d.is_empty())
            .map(|d| truncate_chars(&d, 200));

        Some(listing)
    }
}

impl CatalogSite for PerfectSense {
    const NAME: &'static str = "Perfect Sense";
    const MAX_PAGES: u32 = 1;

    fn page_url(&self, _page: u32) -> String {
        Self::category_url()
    }

    fn parse_page(&self, html: &str, _page: u32) -> CatalogPage {
        let document = Html::parse_document(html);
        let listings = document
            .select(&PRODUCT)
            .filter_map(Self::parse_product)
            .collect();

        CatalogPage {
            listings,
            has_next: false,
        }
    }

    /// Every item shares the category URL, so titles identify them.
    fn dedup_key(&self, listing: &Listing) -> String {
        listing.title.clone()
    }
}
