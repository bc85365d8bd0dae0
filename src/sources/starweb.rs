//! Product gallery markup shared by shops on the Starweb platform.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::domain::Listing;
use crate::sources::catalog::CatalogPage;
use crate::sources::common::{extract_price, first_attr, non_empty_text, resolve_url};

static PRODUCT: Lazy<Selector> = Lazy::new(|| Selector::parse("li.gallery-item").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a.gallery-info-link").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse(".description h3").unwrap());
static PRICE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".product-price .amount").unwrap());
static DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".description .product-sku, .description p").unwrap());
static STOCK: Lazy<Selector> = Lazy::new(|| Selector::parse(".stock-status").unwrap());
static IMAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());
static PAGINATION: Lazy<Selector> = Lazy::new(|| Selector::parse(".pagination").unwrap());
static NEXT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[rel='next'], a.next:not(.disabled)").unwrap());

/// Parse one gallery page. `origin` ends up in each listing's `source`
/// metadata; the stock status text is reported as the location.
pub(crate) fn parse_gallery(html: &str, base_url: &str, origin: &str) -> CatalogPage {
    let document = Html::parse_document(html);
    let listings = document
        .select(&PRODUCT)
        .filter_map(|node| parse_product(node, base_url, origin))
        .collect();
    let has_next = document
        .select(&PAGINATION)
        .next()
        .is_some_and(|pagination| pagination.select(&NEXT).next().is_some());

    CatalogPage { listings, has_next }
}

fn parse_product(node: ElementRef<'_>, base_url: &str, origin: &str) -> Option<Listing> {
    let link = node.select(&LINK).next()?;
    let title = node.select(&TITLE).next().and_then(non_empty_text)?;
    let url = link
        .value()
        .attr("href")
        .and_then(|href| resolve_url(base_url, href))?;

    let mut listing = Listing::new(title, url).with_metadata("source", origin);
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
        .and_then(|img| first_attr(img, &["data-src", "src"]))
        .and_then(|src| resolve_url(base_url, &src));

    Some(listing)
}
