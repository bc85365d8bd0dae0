use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single marketplace item as produced by a source adapter.
///
/// `posted_date` is kept in the source's own phrasing; see
/// [`crate::dates::normalize`] for interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub title: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub url: String,
    pub image_url: Option<String>,
    pub posted_date: Option<String>,
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub source_metadata: BTreeMap<String, String>,
}

impl Listing {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            price: None,
            url: url.into(),
            image_url: None,
            posted_date: None,
            location: None,
            source_metadata: BTreeMap::new(),
        }
    }

    pub fn with_posted_date(mut self, posted_date: impl Into<String>) -> Self {
        self.posted_date = Some(posted_date.into());
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.source_metadata.insert(key.into(), value.into());
        self
    }

    pub fn display_title(&self) -> &str {
        let title = self.title.trim();
        if title.is_empty() {
            "Untitled listing"
        } else {
            title
        }
    }
}

/// A listing tagged with the name of the source that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedListing {
    pub source: String,
    #[serde(flatten)]
    pub listing: Listing,
}
