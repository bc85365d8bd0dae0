use std::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};

/// A non-fatal problem noticed during one search run.
///
/// Diagnostics never stop the run; they are handed back next to the
/// listings so the caller decides how to surface them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A source token matched nothing in the registry.
    UnrecognizedSource {
        token: String,
        available: Vec<String>,
    },
    /// The query was blank, so no source was asked.
    EmptyQuery,
    /// A source did not answer before its deadline.
    Timeout {
        source: String,
        #[serde(serialize_with = "as_secs")]
        after: Duration,
    },
    /// A source failed; `kind` is the error classification.
    SourceFailed {
        source: String,
        kind: String,
        message: String,
    },
}

fn as_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

impl Diagnostic {
    /// Name of the source this diagnostic is about, if any.
    pub fn source(&self) -> Option<&str> {
        match self {
            Diagnostic::Timeout { source, .. } | Diagnostic::SourceFailed { source, .. } => {
                Some(source)
            }
            Diagnostic::UnrecognizedSource { .. } | Diagnostic::EmptyQuery => None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnrecognizedSource { token, available } => write!(
                f,
                "Unknown site '{}'. Available sites: {}",
                token,
                available.join(", ")
            ),
            Diagnostic::EmptyQuery => write!(f, "Empty search query, no sites were searched"),
            Diagnostic::Timeout { source, after } => {
                write!(f, "{} timed out after {}s", source, after.as_secs())
            }
            Diagnostic::SourceFailed {
                source,
                kind,
                message,
            } => write!(f, "{} failed ({}): {}", source, kind, message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let diag = Diagnostic::UnrecognizedSource {
            token: "blocket".into(),
            available: vec!["HifiTorget".into(), "Taktoton".into()],
        };
        assert_eq!(
            diag.to_string(),
            "Unknown site 'blocket'. Available sites: HifiTorget, Taktoton"
        );

        let diag = Diagnostic::Timeout {
            source: "Taktoton".into(),
            after: Duration::from_secs(60),
        };
        assert_eq!(diag.to_string(), "Taktoton timed out after 60s");
    }

    #[test]
    fn test_serializes_tagged() {
        let diag = Diagnostic::SourceFailed {
            source: "HiFi Puls".into(),
            kind: "http-status".into(),
            message: "503".into(),
        };
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["type"], "source_failed");
        assert_eq!(json["kind"], "http-status");

        let json = serde_json::to_value(Diagnostic::Timeout {
            source: "x".into(),
            after: Duration::from_millis(1500),
        })
        .unwrap();
        assert_eq!(json["after"], 1.5);
    }

    #[test]
    fn test_source() {
        assert_eq!(Diagnostic::EmptyQuery.source(), None);
        let diag = Diagnostic::SourceFailed {
            source: "Taktoton".into(),
            kind: "parse".into(),
            message: String::new(),
        };
        assert_eq!(diag.source(), Some("Taktoton"));
    }
}
