use thiserror::Error;

#[derive(Error, Debug)]
pub enum HifiscoutError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot use both include and exclude source filters together")]
    ConflictingSourceFilters,

    #[error("Search cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl HifiscoutError {
    /// Stable classification used in per-source diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http(e) if e.is_timeout() => "http-timeout",
            Self::Http(e) if e.is_status() => "http-status",
            Self::Http(_) => "http",
            Self::Browser(_) => "browser",
            Self::Parse(_) => "parse",
            Self::InvalidUrl(_) => "invalid-url",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Config(_) => "config",
            Self::ConflictingSourceFilters => "conflicting-filters",
            Self::Cancelled => "cancelled",
            Self::Other(_) => "other",
        }
    }
}

pub type Result<T> = std::result::Result<T, HifiscoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_is_stable_per_variant() {
        assert_eq!(HifiscoutError::Parse("bad".into()).kind(), "parse");
        assert_eq!(HifiscoutError::Browser("gone".into()).kind(), "browser");
        assert_eq!(HifiscoutError::Cancelled.kind(), "cancelled");
        assert_eq!(
            HifiscoutError::ConflictingSourceFilters.kind(),
            "conflicting-filters"
        );
    }

    #[test]
    fn test_invalid_url_converts() {
        let err: HifiscoutError = url::Url::parse("not a url").unwrap_err().into();
        assert_eq!(err.kind(), "invalid-url");
    }
}
