//! HifiTorget, a Swedish classifieds marketplace for hifi gear.
//!
//! The site markup has changed more than once, so listings are located with
//! layered heuristics rather than one fixed selector set.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::app::Result;
use crate::domain::Listing;
use crate::sources::common::{
    element_text, extract_price, first_attr, non_empty_text, resolve_url, truncate_chars,
    PriceRange,
};
use crate::sources::{ListingAdapter, PageSource};

const BASE_URL: &str = "https://www.hifitorget.se";
const MAX_LISTINGS: usize = 50;

static SWEDISH_CITIES: &[&str] = &[
    "Stockholm", "Göteborg", "Malmö", "Uppsala", "Västerås", "Örebro", "Linköping",
    "Helsingborg", "Jönköping", "Norrköping", "Lund", "Umeå", "Gävle", "Borås", "Eskilstuna",
    "Södertälje", "Karlstad", "Växjö", "Halmstad", "Sundsvall", "Luleå", "Trollhättan",
    "Östersund",
];

static CITY_RES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    SWEDISH_CITIES
        .iter()
        .map(|city| (*city, Regex::new(&format!(r"(?i)\b{}\b", city)).unwrap()))
        .collect()
});

static ANY: Lazy<Selector> = Lazy::new(|| Selector::parse("*").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse("h1, h2, h3, h4").unwrap());
static IMAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());

static LISTING_CLASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)listing|item|annons|ad").unwrap());
static LISTING_DIV_CLASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)listing|item|annons|ad|product").unwrap());
static LISTING_TESTID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)listing|item|annons").unwrap());
static LISTING_HREF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)/annons|/produkt|/listing").unwrap());
static ITEM_HREF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)/annons|/produkt|/item|/listing").unwrap());
static KRONOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\d+\s*kr").unwrap());
static PRICE_TEXT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\d+[\s.,]*\d*\s*kr").unwrap());
static TITLE_CLASS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)title|heading|name").unwrap());
static PRICE_CLASS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)price|pris|cost").unwrap());
static DESCRIPTION_CLASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)description|text|beskrivning|excerpt").unwrap());
static DATE_TEXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}|\d{1,2}[/-]\d{1,2}[/-]\d{2,4}|\d+\s+\w+\s+\d{4}").unwrap()
});
static DATE_CLASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)date|datum|time|posted").unwrap());
static LOCATION_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:Plats|Stad|Location|Från)[:\s]+([A-ZÄÖÅ][a-zäöå]+(?:\s+[A-ZÄÖÅ][a-zäöå]+)*)")
        .unwrap()
});

/// Adapter for the HifiTorget search endpoint.
pub struct HifiTorget {
    pages: Arc<dyn PageSource>,
}

impl HifiTorget {
    pub const NAME: &'static str = "HifiTorget";

    pub fn new(pages: Arc<dyn PageSource>) -> Self {
        Self { pages }
    }

    fn search_url(path: &str, query: &str, range: PriceRange) -> Result<String> {
        let mut url = Url::parse(BASE_URL)?.join(path)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", query);
            if let Some(min) = range.min {
                pairs.append_pair("min_pris", &(min as i64).to_string());
            }
            if let Some(max) = range.max {
                pairs.append_pair("max_pris", &(max as i64).to_string());
            }
        }
        Ok(url.into())
    }

    /// Locate listing containers and parse each one.
    pub fn parse_results(html: &str) -> Vec<Listing> {
        let document = Html::parse_document(html);
        find_listing_nodes(&document)
            .into_iter()
            .filter_map(parse_listing)
            .collect()
    }
}

#[async_trait]
impl ListingAdapter for HifiTorget {
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

        let primary = Self::search_url("/sok", query, range)?;
        let html = match self.pages.fetch_html(&primary).await {
            Ok(Some(html)) => Some(html),
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(url = %primary, error = %e, "primary search endpoint failed");
                None
            }
        };

        let html = match html {
            Some(html) => html,
            None => {
                let fallback = Self::search_url("/annonser", query, range)?;
                match self.pages.fetch_html(&fallback).await? {
                    Some(html) => html,
                    None => return Ok(Vec::new()),
                }
            }
        };

        Ok(Self::parse_results(&html))
    }

    async fn close(&self) -> Result<()> {
        self.pages.close().await
    }
}

fn class_matches(element: ElementRef<'_>, re: &Regex) -> bool {
    element.value().attr("class").is_some_and(|c| re.is_match(c))
}

fn nearest_container<'a>(element: ElementRef<'a>, tags: &[&str]) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| tags.contains(&a.value().name()))
}

fn find_listing_nodes(document: &Html) -> Vec<ElementRef<'_>> {
    let strategies: [(&str, &str, &Lazy<Regex>); 5] = [
        ("article", "class", &LISTING_CLASS_RE),
        ("div", "class", &LISTING_DIV_CLASS_RE),
        ("div", "data-testid", &LISTING_TESTID_RE),
        ("li", "class", &LISTING_CLASS_RE),
        ("a", "href", &LISTING_HREF_RE),
    ];

    for (tag, attr, re) in strategies {
        let found: Vec<_> = document
            .select(&ANY)
            .filter(|el| el.value().name() == tag)
            .filter(|el| el.value().attr(attr).is_some_and(|v| re.is_match(v)))
            .collect();
        if !found.is_empty() {
            return found.into_iter().take(MAX_LISTINGS).collect();
        }
    }

    let mut seen = HashSet::new();
    let mut nodes = Vec::new();

    // Containers around links that look like item pages
    for link in document.select(&LINK) {
        let href = link.value().attr("href").unwrap_or_default();
        if !ITEM_HREF_RE.is_match(href) {
            continue;
        }
        if let Some(parent) = nearest_container(link, &["article", "div", "li"]) {
            if seen.insert(parent.id()) {
                nodes.push(parent);
            }
        }
    }

    // Last resort: anything wrapping a "<n> kr" price
    if nodes.is_empty() {
        for node in document.root_element().descendants() {
            let is_price = node.value().as_text().is_some_and(|t| KRONOR_RE.is_match(t));
            if !is_price {
                continue;
            }
            let parent = node
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|a| matches!(a.value().name(), "article" | "div" | "li" | "a"));
            if let Some(parent) = parent {
                if seen.insert(parent.id()) {
                    nodes.push(parent);
                }
            }
        }
    }

    nodes.truncate(MAX_LISTINGS);
    nodes
}

fn descendants_with_class<'a>(
    element: ElementRef<'a>,
    re: &'a Regex,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    element.select(&ANY).filter(move |el| class_matches(*el, re))
}

fn find_text<'a>(element: ElementRef<'a>, re: &Regex) -> Option<&'a str> {
    element.text().find(|t| re.is_match(t))
}

fn parse_listing(element: ElementRef<'_>) -> Option<Listing> {
    let mut title = None;
    let mut url = None;

    if let Some(link) = element.select(&LINK).next() {
        title = non_empty_text(link);
        url = link.value().attr("href").and_then(|h| resolve_url(BASE_URL, h));
    }
    if title.is_none() {
        if let Some(heading) = element.select(&HEADING).next() {
            title = non_empty_text(heading);
            url = heading
                .select(&LINK)
                .next()
                .or_else(|| element.select(&LINK).next())
                .and_then(|link| link.value().attr("href"))
                .and_then(|h| resolve_url(BASE_URL, h));
        }
    }
    if title.is_none() {
        title = descendants_with_class(element, &TITLE_CLASS_RE)
            .next()
            .and_then(non_empty_text);
    }
    let title = title?;

    let price = find_text(element, &PRICE_TEXT_RE)
        .and_then(extract_price)
        .or_else(|| {
            descendants_with_class(element, &PRICE_CLASS_RE)
                .next()
                .and_then(|el| extract_price(&element_text(el)))
        });

    let image_url = element
        .select(&IMAGE)
        .next()
        .and_then(|img| first_attr(img, &["src", "data-src", "data-lazy-src", "data-original"]))
        .and_then(|src| resolve_url(BASE_URL, &src));

    let full_text = element_text(element);
    let description = match descendants_with_class(element, &DESCRIPTION_CLASS_RE).next() {
        Some(el) => non_empty_text(el),
        None => {
            let rest = full_text.replacen(&title, "", 1);
            let rest = rest.trim();
            (!rest.is_empty()).then(|| truncate_chars(rest, 503))
        }
    };

    let posted_date = find_text(element, &DATE_TEXT_RE)
        .map(|t| t.trim().to_string())
        .or_else(|| {
            descendants_with_class(element, &DATE_CLASS_RE)
                .next()
                .and_then(non_empty_text)
        });

    let location = CITY_RES
        .iter()
        .find(|(_, re)| re.is_match(&full_text))
        .map(|(city, _)| city.to_string())
        .or_else(|| {
            LOCATION_LABEL_RE
                .captures(&full_text)
                .map(|caps| caps[1].trim().to_string())
        });

    let snippet: String = element.html().chars().take(1000).collect();
    let listing = Listing {
        title,
        description,
        price,
        url: url.unwrap_or_else(|| BASE_URL.to_string()),
        image_url,
        posted_date,
        location,
        source_metadata: Default::default(),
    }
    .with_metadata("html", snippet)
    .with_metadata("price_source", if price.is_some() { "found" } else { "missing" });

    Some(listing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::catalog::tests::CannedPages;

    const RESULTS: &str = r#"
    <main>
      <article class="annons-card">
        <a href="/annons/4711-hegel-h90">Hegel H90</a>
        <img data-src="/bilder/4711.jpg">
        <p class="beskrivning">Säljer min Hegel H90, inga repor.</p>
        <span class="pris">8 500 kr</span>
        <span class="datum">2024-10-15</span>
        <span>Göteborg</span>
      </article>
      <article class="annons-card">
        <h3>Rega Brio</h3>
        <time class="posted">Igår</time>
        <div>Plats: Falun</div>
      </article>
    </main>
    "#;

    #[test]
    fn test_parse_results_from_article_cards() {
        let listings = HifiTorget::parse_results(RESULTS);
        assert_eq!(listings.len(), 2);

        let hegel = &listings[0];
        assert_eq!(hegel.title, "Hegel H90");
        assert_eq!(hegel.url, "https://www.hifitorget.se/annons/4711-hegel-h90");
        assert_eq!(hegel.price, Some(8500.0));
        assert_eq!(
            hegel.description.as_deref(),
            Some("Säljer min Hegel H90, inga repor.")
        );
        assert_eq!(hegel.posted_date.as_deref(), Some("2024-10-15"));
        assert_eq!(hegel.location.as_deref(), Some("Göteborg"));
        assert_eq!(
            hegel.image_url.as_deref(),
            Some("https://www.hifitorget.se/bilder/4711.jpg")
        );
        assert_eq!(
            hegel.source_metadata.get("price_source").map(String::as_str),
            Some("found")
        );

        let rega = &listings[1];
        assert_eq!(rega.title, "Rega Brio");
        assert_eq!(rega.url, "https://www.hifitorget.se");
        assert_eq!(rega.posted_date.as_deref(), Some("Igår"));
        assert_eq!(rega.location.as_deref(), Some("Falun"));
        assert!(rega.price.is_none());
    }

    #[test]
    fn test_falls_back_to_price_text_containers() {
        let html = r#"<section><div><span class="name">Rotel RA-12</span> 3 000 kr</div></section>"#;
        let listings = HifiTorget::parse_results(html);
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].price, Some(3000.0));
    }

    #[test]
    fn test_search_url_encodes_query_and_prices() {
        let url = HifiTorget::search_url(
            "/sok",
            "hegel h90",
            PriceRange::new(Some(1000.0), Some(9999.5)),
        )
        .unwrap();
        assert_eq!(
            url,
            "https://www.hifitorget.se/sok?q=hegel+h90&min_pris=1000&max_pris=9999"
        );
    }

    #[tokio::test]
    async fn test_search_falls_back_to_listing_endpoint() {
        let fallback = HifiTorget::search_url("/annonser", "hegel", PriceRange::default()).unwrap();
        let pages = Arc::new(CannedPages::default().with(&fallback, RESULTS));
        let adapter = HifiTorget::new(pages.clone());

        let listings = adapter.search(" hegel ", None, None).await.unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(pages.requested.lock().unwrap().len(), 2);
    }
}
