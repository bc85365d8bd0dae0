//! Helpers shared by the HTML adapters.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;
use url::Url;

static PRICE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d[\d\s.,]*").unwrap());

/// Optional price bounds forwarded from the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PriceRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PriceRange {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    /// A listing without a known price is never excluded.
    pub fn admits(&self, price: Option<f64>) -> bool {
        let Some(price) = price else {
            return true;
        };
        self.min.is_none_or(|min| price >= min) && self.max.is_none_or(|max| price <= max)
    }
}

/// Pull a price out of text such as `"12 500 kr"`, `"1.995:-"` or
/// `"4 995,00 kr"`.
pub fn extract_price(text: &str) -> Option<f64> {
    let raw = PRICE_RE.find(text)?.as_str();
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let compact = compact.trim_end_matches(['.', ',']);

    // Two trailing digits after the last separator are decimals
    let (whole, fraction) = match compact.rfind(['.', ',']) {
        Some(idx) if compact.len() - idx == 3 => (&compact[..idx], Some(&compact[idx + 1..])),
        _ => (compact, None),
    };

    let mut number: String = whole.chars().filter(char::is_ascii_digit).collect();
    if number.is_empty() {
        return None;
    }
    if let Some(fraction) = fraction {
        number.push('.');
        number.push_str(fraction);
    }

    number.parse().ok()
}

/// Resolve `href` against the site's base URL.
pub fn resolve_url(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let base = Url::parse(base).ok()?;
    base.join(href).ok().map(String::from)
}

/// A search query compiled once and matched against many listings.
#[derive(Debug, Clone)]
pub struct QueryMatcher {
    phrase: String,
    terms: Vec<Regex>,
}

impl QueryMatcher {
    pub fn new(query: &str) -> Self {
        let phrase = query.trim().to_lowercase();
        let terms = phrase
            .split_whitespace()
            .filter_map(|term| {
                let pattern = format!(
                    r"(?:^|[^\p{{L}}\p{{N}}]){}(?:$|[^\p{{L}}\p{{N}}])",
                    regex::escape(term)
                );
                match Regex::new(&pattern) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        tracing::debug!(term, error = %e, "skipping unmatchable query term");
                        None
                    }
                }
            })
            .collect();
        Self { phrase, terms }
    }

    /// True when every whitespace-separated term occurs in `haystack` as a
    /// whole word, ignoring case.
    pub fn matches_words(&self, haystack: &str) -> bool {
        if self.terms.is_empty() {
            return false;
        }
        let haystack = haystack.to_lowercase();
        self.terms.iter().all(|re| re.is_match(&haystack))
    }

    /// Case-insensitive substring match on the whole query.
    pub fn contained_in(&self, haystack: &str) -> bool {
        !self.phrase.is_empty() && haystack.to_lowercase().contains(&self.phrase)
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Visible text of an element with whitespace collapsed.
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Like [`element_text`], but `None` for elements with no visible text.
pub fn non_empty_text(element: ElementRef<'_>) -> Option<String> {
    Some(element_text(element)).filter(|t| !t.is_empty())
}

/// First present, non-empty attribute among `names`.
pub fn first_attr(element: ElementRef<'_>, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| element.value().attr(name))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(String::from)
}

/// Cut `text` to at most `max` characters, appending an ellipsis when cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
