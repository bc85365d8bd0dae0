pub mod diagnostic;
pub mod listing;
pub mod source_result;

pub use diagnostic::Diagnostic;
pub use listing::{Listing, RankedListing};
pub use source_result::{SourceListings, SourceResult};
