//! Recency filtering and global ordering of collected listings.
//!
//! Both steps are pure and synchronous. Dates are normalized on the fly and
//! never written back onto a [`Listing`].

use std::cmp::Ordering;

use chrono::{NaiveDateTime, TimeDelta};

use crate::dates;
use crate::domain::{Listing, RankedListing, SourceListings, SourceResult};

/// Drop listings older than `max_age_days`, per source.
///
/// `max_age_days <= 0` disables the filter. Listings without a date, or
/// whose date cannot be read, are always kept.
pub fn filter_recent(results: SourceResult, max_age_days: i64, now: NaiveDateTime) -> SourceResult {
    if max_age_days <= 0 {
        return results;
    }
    let Some(cutoff) = TimeDelta::try_days(max_age_days).and_then(|age| now.checked_sub_signed(age))
    else {
        return results;
    };

    results
        .into_iter()
        .map(|SourceListings { source, listings }| {
            let before = listings.len();
            let listings: Vec<Listing> = listings
                .into_iter()
                .filter(|listing| is_recent(listing, cutoff, now))
                .collect();
            tracing::debug!(
                source = %source,
                kept = listings.len(),
                dropped = before - listings.len(),
                "applied recency filter"
            );
            SourceListings { source, listings }
        })
        .collect()
}

fn is_recent(listing: &Listing, cutoff: NaiveDateTime, now: NaiveDateTime) -> bool {
    dates::normalize_optional(listing.posted_date.as_deref(), now)
        .instant()
        .is_none_or(|posted| posted >= cutoff)
}

/// Flatten every source into one list, newest first.
///
/// Dated listings come before undated ones. The sort is stable, so ties and
/// undated listings keep source order, then per-source order.
pub fn sort_by_recency(results: SourceResult, now: NaiveDateTime) -> Vec<RankedListing> {
    let mut keyed: Vec<(Option<NaiveDateTime>, RankedListing)> = results
        .into_iter()
        .flat_map(|SourceListings { source, listings }| {
            listings.into_iter().map(move |listing| {
                let date = dates::normalize_optional(listing.posted_date.as_deref(), now).instant();
                (
                    date,
                    RankedListing {
                        source: source.clone(),
                        listing,
                    },
                )
            })
        })
        .collect();

    keyed.sort_by(|(a, _), (b, _)| newest_first(a, b));
    keyed.into_iter().map(|(_, ranked)| ranked).collect()
}

fn newest_first(a: &Option<NaiveDateTime>, b: &Option<NaiveDateTime>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
