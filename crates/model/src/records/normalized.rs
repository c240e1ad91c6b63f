use serde::{Deserialize, Serialize};

/// The destination image of one source row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub part1: String,
    pub part2: String,
}

impl NormalizedRecord {
    pub fn new(part1: impl Into<String>, part2: impl Into<String>) -> Self {
        NormalizedRecord {
            part1: part1.into(),
            part2: part2.into(),
        }
    }
}

/// Outcome of transforming a single raw record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mapped {
    Record(NormalizedRecord),
    /// The row cannot be represented at the destination and is dropped.
    Unmappable { id: u64, reason: String },
}

impl Mapped {
    pub fn record(self) -> Option<NormalizedRecord> {
        match self {
            Mapped::Record(r) => Some(r),
            Mapped::Unmappable { .. } => None,
        }
    }
}
