use chrono::{DateTime, Utc};
use model::progress::TransferProgress;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU64, AtomicUsize, Ordering},
};

#[derive(Debug, Default)]
struct InnerMetrics {
    batches_attempted: AtomicU64,
    batches_committed: AtomicU64,
    batches_skipped: AtomicU64,
    rows_read: AtomicU64,
    rows_written: AtomicU64,
    rows_unmappable: AtomicU64,
    rows_skipped: AtomicU64,
    retry_count: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    last_error: Mutex<Option<String>>,
}

/// Live counters for one transfer run, shared between the orchestrator and
/// its write tasks.
#[derive(Debug, Clone)]
pub struct Metrics {
    run_id: Arc<str>,
    started_at: DateTime<Utc>,
    inner: Arc<InnerMetrics>,
}

impl Metrics {
    pub fn new(run_id: impl Into<String>) -> Self {
        let run_id: String = run_id.into();
        Metrics {
            run_id: Arc::from(run_id),
            started_at: Utc::now(),
            inner: Arc::new(InnerMetrics::default()),
        }
    }

    /// Fresh counters under a random run id.
    pub fn for_new_run() -> Self {
        Self::new(format!("run-{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn add_rows_read(&self, count: u64) {
        self.inner.rows_read.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_unmappable(&self, count: u64) {
        self.inner
            .rows_unmappable
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn batch_attempted(&self) {
        self.inner
            .batches_attempted
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn batch_committed(&self, rows: u64) {
        self.inner
            .batches_committed
            .fetch_add(1, Ordering::Relaxed);
        self.inner.rows_written.fetch_add(rows, Ordering::Relaxed);
    }

    pub fn batch_skipped(&self, rows: u64) {
        self.inner.batches_skipped.fetch_add(1, Ordering::Relaxed);
        self.inner.rows_skipped.fetch_add(rows, Ordering::Relaxed);
    }

    pub fn increment_retries(&self) {
        self.inner.retry_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn retries(&self) -> u64 {
        self.inner.retry_count.load(Ordering::Relaxed)
    }

    pub fn record_error(&self, message: impl Into<String>) {
        if let Ok(mut last) = self.inner.last_error.lock() {
            *last = Some(message.into());
        }
    }

    /// Marks one write as in flight until the returned guard drops.
    pub fn enter_write(&self) -> InFlightGuard {
        let now = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlightGuard {
            inner: self.inner.clone(),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous writes observed so far.
    pub fn peak_in_flight(&self) -> usize {
        self.inner.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> TransferProgress {
        let last_error = self
            .inner
            .last_error
            .lock()
            .ok()
            .and_then(|guard| guard.clone());

        TransferProgress {
            run_id: self.run_id.to_string(),
            batches_attempted: self.inner.batches_attempted.load(Ordering::Relaxed),
            batches_committed: self.inner.batches_committed.load(Ordering::Relaxed),
            batches_skipped: self.inner.batches_skipped.load(Ordering::Relaxed),
            rows_read: self.inner.rows_read.load(Ordering::Relaxed),
            rows_written: self.inner.rows_written.load(Ordering::Relaxed),
            rows_unmappable: self.inner.rows_unmappable.load(Ordering::Relaxed),
            rows_skipped: self.inner.rows_skipped.load(Ordering::Relaxed),
            last_error,
            started_at: self.started_at,
            finished_at: None,
        }
    }

    /// Snapshot stamped with the finish time.
    pub fn finish(&self) -> TransferProgress {
        TransferProgress {
            finished_at: Some(Utc::now()),
            ..self.snapshot()
        }
    }
}

/// Decrements the in-flight gauge on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    inner: Arc<InnerMetrics>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
