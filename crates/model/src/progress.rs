use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Counters for one transfer run.
///
/// Process-local and reset at the start of every run; nothing here is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferProgress {
    pub run_id: String,
    pub batches_attempted: u64,
    pub batches_committed: u64,
    /// Batches dropped after a write failure in best-effort mode.
    pub batches_skipped: u64,
    pub rows_read: u64,
    pub rows_written: u64,
    /// Rows the transformer could not map (e.g. `NULL` text).
    pub rows_unmappable: u64,
    /// Rows belonging to skipped batches.
    pub rows_skipped: u64,
    pub last_error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl TransferProgress {
    pub fn new(run_id: impl Into<String>) -> Self {
        TransferProgress {
            run_id: run_id.into(),
            batches_attempted: 0,
            batches_committed: 0,
            batches_skipped: 0,
            rows_read: 0,
            rows_written: 0,
            rows_unmappable: 0,
            rows_skipped: 0,
            last_error: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Rows read but not written.
    pub fn gap(&self) -> u64 {
        self.rows_read.saturating_sub(self.rows_written)
    }

    /// Rows read that are neither written nor accounted for by a known drop.
    pub fn unexplained_gap(&self) -> u64 {
        self.gap()
            .saturating_sub(self.rows_unmappable + self.rows_skipped)
    }

    pub fn is_complete_copy(&self) -> bool {
        self.rows_written == self.rows_read && self.batches_skipped == 0
    }
}
