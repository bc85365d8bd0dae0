use serde::{Deserialize, Serialize};

use crate::domain::Listing;

/// Listings collected from one source during a single search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceListings {
    pub source: String,
    pub listings: Vec<Listing>,
}

/// Mapping from source name to the listings it returned.
///
/// Entries keep the order in which sources were activated, which is what
/// the global sort falls back on for equal keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceResult {
    entries: Vec<SourceListings>,
}

impl SourceResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the listings for `source`, replacing any earlier entry in place.
    pub fn insert(&mut self, source: impl Into<String>, listings: Vec<Listing>) {
        let source = source.into();
        match self.entries.iter_mut().find(|e| e.source == source) {
            Some(entry) => entry.listings = listings,
            None => self.entries.push(SourceListings { source, listings }),
        }
    }

    pub fn get(&self, source: &str) -> Option<&[Listing]> {
        self.entries
            .iter()
            .find(|e| e.source == source)
            .map(|e| e.listings.as_slice())
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.source.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceListings> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_listings(&self) -> usize {
        self.entries.iter().map(|e| e.listings.len()).sum()
    }
}

impl IntoIterator for SourceResult {
    type Item = SourceListings;
    type IntoIter = std::vec::IntoIter<SourceListings>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<SourceListings> for SourceResult {
    fn from_iter<T: IntoIterator<Item = SourceListings>>(iter: T) -> Self {
        let mut result = SourceResult::new();
        for entry in iter {
            result.insert(entry.source, entry.listings);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_activation_order() {
        let mut result = SourceResult::new();
        result.insert("Tradera", vec![]);
        result.insert("Blocket", vec![Listing::new("a", "u")]);
        result.insert("HifiTorget", vec![]);

        let names: Vec<_> = result.sources().collect();
        assert_eq!(names, vec!["Tradera", "Blocket", "HifiTorget"]);
        assert_eq!(result.total_listings(), 1);
    }

    #[test]
    fn test_insert_replaces_existing_entry() {
        let mut result = SourceResult::new();
        result.insert("Blocket", vec![]);
        result.insert("Tradera", vec![]);
        result.insert("Blocket", vec![Listing::new("a", "u")]);

        assert_eq!(result.len(), 2);
        assert_eq!(result.get("Blocket").map(<[_]>::len), Some(1));
        assert_eq!(result.sources().next(), Some("Blocket"));
    }

    #[test]
    fn test_get_missing_source() {
        let result = SourceResult::new();
        assert!(result.get("Nowhere").is_none());
        assert!(result.is_empty());
    }
}
