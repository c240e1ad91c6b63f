use crate::settings::error::SettingsError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// How rows are pulled from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadStrategy {
    /// Repeated keyset queries, one page per round trip.
    #[default]
    Paginated,
    /// A single server-side cursor consumed in chunks.
    Streamed,
}

/// What happens to the run when a batch cannot be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    #[default]
    Abort,
    BestEffort,
}

impl FromStr for ReadStrategy {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paginated" | "paged" => Ok(ReadStrategy::Paginated),
            "streamed" | "stream" => Ok(ReadStrategy::Streamed),
            other => Err(SettingsError::UnknownVariant {
                kind: "read strategy",
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "abort" => Ok(FailurePolicy::Abort),
            "best-effort" | "skip" => Ok(FailurePolicy::BestEffort),
            other => Err(SettingsError::UnknownVariant {
                kind: "failure policy",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ReadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadStrategy::Paginated => write!(f, "paginated"),
            ReadStrategy::Streamed => write!(f, "streamed"),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Abort => write!(f, "abort"),
            FailurePolicy::BestEffort => write!(f, "best-effort"),
        }
    }
}
