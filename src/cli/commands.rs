use std::fmt::Write as _;

use tokio_util::sync::CancellationToken;

use crate::app::{AppContext, HifiscoutError, Result, SearchReport, SearchRequest};
use crate::cli::Cli;

const RULE_WIDTH: usize = 80;

/// Run every `-s` term in order, printing each report as it completes.
///
/// A failing term is reported and skipped. Cancellation and conflicting
/// filters stop the whole batch.
pub async fn search(ctx: &AppContext, cli: &Cli, cancel: &CancellationToken) -> Result<()> {
    for term in &cli.search {
        let request = SearchRequest {
            query: term.clone(),
            max_age_days: cli.days,
            include: cli.include.clone(),
            exclude: cli.exclude.clone(),
            min_price: cli.min_price,
            max_price: cli.max_price,
        };

        match ctx.search(&request, cancel).await {
            Ok(report) => {
                for diagnostic in &report.diagnostics {
                    eprintln!("warning: {}", diagnostic);
                }
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    print!("{}", render_report(&report));
                }
            }
            Err(e @ (HifiscoutError::Cancelled | HifiscoutError::ConflictingSourceFilters)) => {
                return Err(e)
            }
            Err(e) => eprintln!("Error processing search term \"{}\": {}", term, e),
        }
    }

    Ok(())
}

pub fn list_sources(ctx: &AppContext) {
    println!("Available sites:");
    for name in ctx.registry.names() {
        let marker = if ctx
            .config
            .default_sources
            .iter()
            .any(|s| s.eq_ignore_ascii_case(name))
        {
            " (default)"
        } else {
            ""
        };
        println!("  - {}{}", name, marker);
    }
}

/// Plain text rendering of a report, newest listing first.
pub fn render_report(report: &SearchReport) -> String {
    let mut out = String::new();
    let rule = "═".repeat(RULE_WIDTH);

    if report.listings.is_empty() {
        let _ = writeln!(out, "\nNo results found for: '{}'", report.query);
        if let Some(days) = report.max_age_days.filter(|d| *d > 0) {
            let _ = writeln!(out, "   (Filtered to last {} days)", days);
        }
        return out;
    }

    let _ = writeln!(out, "\n{}", rule);
    let _ = write!(out, "Search results: '{}'", report.query);
    if let Some(days) = report.max_age_days.filter(|d| *d > 0) {
        let _ = write!(out, " (last {} days)", days);
    }
    let _ = writeln!(out, "\n{}\n", rule);

    for (idx, ranked) in report.listings.iter().enumerate() {
        let listing = &ranked.listing;
        let mut info = Vec::new();
        if let Some(date) = &listing.posted_date {
            info.push(date.clone());
        }
        if let Some(price) = listing.price.filter(|p| *p > 0.0) {
            info.push(format_price(price));
        }
        if let Some(location) = &listing.location {
            info.push(location.clone());
        }
        info.push(ranked.source.clone());

        let _ = writeln!(
            out,
            "{:3}. {} | {}",
            idx + 1,
            listing.display_title(),
            info.join(" | ")
        );
        let _ = writeln!(out, "     {}", listing.url);
    }

    let total = report.total();
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(
        out,
        "Total: {} result{} found across all sites",
        total,
        if total == 1 { "" } else { "s" }
    );
    out
}

/// `12500.0` → `"12,500 kr"`.
pub fn format_price(price: f64) -> String {
    let digits = (price.round() as i64).unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{} kr", grouped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::context::SourceCount;
    use crate::domain::{Listing, RankedListing};

    fn report(listings: Vec<RankedListing>, max_age_days: Option<i64>) -> SearchReport {
        SearchReport {
            query: "hegel".into(),
            max_age_days,
            per_source_counts: vec![SourceCount {
                source: "HifiTorget".into(),
                count: listings.len(),
            }],
            listings,
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(0.0), "0 kr");
        assert_eq!(format_price(950.0), "950 kr");
        assert_eq!(format_price(12500.0), "12,500 kr");
        assert_eq!(format_price(1234567.6), "1,234,568 kr");
    }

    #[test]
    fn test_render_empty_report() {
        let text = render_report(&report(Vec::new(), Some(3)));
        assert!(text.contains("No results found for: 'hegel'"));
        assert!(text.contains("(Filtered to last 3 days)"));
    }

    #[test]
    fn test_render_listing_line() {
        let mut listing = Listing::new("  ", "https://www.hifitorget.se/annons/1")
            .with_posted_date("igår")
            .with_price(8500.0);
        listing.location = Some("Malmö".into());
        let text = render_report(&report(
            vec![RankedListing {
                source: "HifiTorget".into(),
                listing,
            }],
            None,
        ));

        assert!(text.contains("Search results: 'hegel'\n"));
        assert!(text.contains("  1. Untitled listing | igår | 8,500 kr | Malmö | HifiTorget\n"));
        assert!(text.contains("     https://www.hifitorget.se/annons/1\n"));
        assert!(text.contains("Total: 1 result found across all sites"));
    }
}
