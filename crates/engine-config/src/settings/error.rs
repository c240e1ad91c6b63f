use connectors::error::ConnectorError;
use thiserror::Error;

/// Errors raised while building or validating transfer settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A setting is out of range or inconsistent with another one.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A textual option did not name a known variant.
    #[error("Unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },

    /// A table or column name failed identifier validation.
    #[error("Invalid table layout: {0}")]
    Table(#[from] ConnectorError),
}
