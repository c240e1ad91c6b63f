use crate::error::ConnectorError;
use serde::{Deserialize, Serialize};

/// Source table layout: a monotonically increasing id and a compound text column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTable {
    pub table: String,
    pub id_column: String,
    pub text_column: String,
}

impl Default for SourceTable {
    fn default() -> Self {
        SourceTable {
            table: "origin_table".to_string(),
            id_column: "id".to_string(),
            text_column: "title".to_string(),
        }
    }
}

impl SourceTable {
    pub fn validate(&self) -> Result<(), ConnectorError> {
        validate_identifier(&self.table)?;
        validate_identifier(&self.id_column)?;
        validate_identifier(&self.text_column)
    }
}

/// Destination table layout: two string columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestTable {
    pub table: String,
    pub part1_column: String,
    pub part2_column: String,
}

impl Default for DestTable {
    fn default() -> Self {
        DestTable {
            table: "destination_table".to_string(),
            part1_column: "title1".to_string(),
            part2_column: "title2".to_string(),
        }
    }
}

impl DestTable {
    pub fn validate(&self) -> Result<(), ConnectorError> {
        validate_identifier(&self.table)?;
        validate_identifier(&self.part1_column)?;
        validate_identifier(&self.part2_column)
    }
}

/// Accepts `name` or `schema.name` made of ASCII alphanumerics and `_`.
///
/// Identifiers are interpolated into SQL, so anything that would need
/// escaping is rejected rather than escaped.
pub fn validate_identifier(ident: &str) -> Result<(), ConnectorError> {
    let valid_part = |part: &str| {
        !part.is_empty()
            && part.len() <= 63
            && !part.starts_with(|c: char| c.is_ascii_digit())
            && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    };

    let parts: Vec<&str> = ident.split('.').collect();
    if parts.len() <= 2 && parts.iter().all(|p| valid_part(p)) {
        Ok(())
    } else {
        Err(ConnectorError::InvalidIdentifier(ident.to_string()))
    }
}
