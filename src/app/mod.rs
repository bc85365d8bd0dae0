pub mod context;
pub mod error;

pub use context::{AppContext, SearchReport, SearchRequest};
pub use error::{HifiscoutError, Result};
