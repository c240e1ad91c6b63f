use serde::{Deserialize, Serialize};

/// A row as read from the source table.
///
/// `text` is `None` when the source column holds SQL `NULL`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub id: u64,
    pub text: Option<String>,
}

impl RawRecord {
    pub fn new(id: u64, text: impl Into<String>) -> Self {
        RawRecord {
            id,
            text: Some(text.into()),
        }
    }

    pub fn null(id: u64) -> Self {
        RawRecord { id, text: None }
    }
}
