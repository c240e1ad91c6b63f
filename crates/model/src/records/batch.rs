use crate::records::normalized::NormalizedRecord;
use chrono::{DateTime, Utc};
use std::{fmt, time::Duration};

/// A sealed, ordered group of records written in one destination operation.
///
/// Fields are read-only once sealed; a batch is never split or merged.
#[derive(Debug, Clone)]
pub struct Batch {
    seq: u64,
    records: Vec<NormalizedRecord>,
    first_id: u64,
    last_id: u64,
    created_at: DateTime<Utc>,
}

impl Batch {
    /// Seals `records` as batch number `seq`, fed by source ids `first_id..=last_id`.
    pub fn seal(seq: u64, records: Vec<NormalizedRecord>, first_id: u64, last_id: u64) -> Self {
        Batch {
            seq,
            records,
            first_id,
            last_id,
            created_at: Utc::now(),
        }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_id(&self) -> u64 {
        self.first_id
    }

    pub fn last_id(&self) -> u64 {
        self.last_id
    }

    /// Time since the batch was sealed.
    pub fn age(&self) -> Duration {
        (Utc::now() - self.created_at).to_std().unwrap_or_default()
    }

    pub fn size_bytes(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.part1.len() + r.part2.len())
            .sum()
    }
}

impl fmt::Display for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "batch #{} (ids {}..={}, {} rows)",
            self.seq,
            self.first_id,
            self.last_id,
            self.records.len()
        )
    }
}
