//! In-memory connectors with failure injection.

use async_trait::async_trait;
use connectors::{
    destination::DataDestination, error::ConnectorError, source::DataSource, stream::RecordStream,
};
use model::{
    pagination::{cursor::Cursor, page::Page},
    records::{batch::Batch, normalized::NormalizedRecord, raw::RawRecord},
};
use std::{
    collections::{HashMap, HashSet},
    io,
    sync::{
        Mutex, MutexGuard,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio_util::sync::CancellationToken;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn transient(message: &str) -> ConnectorError {
    ConnectorError::Io(io::Error::new(io::ErrorKind::ConnectionReset, message.to_string()))
}

/// A source table held in memory, sorted by id.
#[derive(Default)]
pub struct MemorySource {
    rows: Vec<RawRecord>,
    /// Fetch calls (1-based) from which on every fetch fails fatally.
    fail_from_fetch: Option<usize>,
    /// Streams fail after yielding this many chunks.
    fail_stream_after: Option<usize>,
    fetch_delay: Option<Duration>,
    fetches: AtomicUsize,
    streams_opened: AtomicUsize,
    closed: AtomicBool,
}

impl MemorySource {
    pub fn new(mut rows: Vec<RawRecord>) -> Self {
        rows.sort_by_key(|r| r.id);
        Self {
            rows,
            ..Self::default()
        }
    }

    /// Rows `1..=count` with text `a{id}_b{id}`.
    pub fn sequential(count: u64) -> Self {
        Self::new((1..=count).map(|id| RawRecord::new(id, format!("a{id}_b{id}"))).collect())
    }

    pub fn fail_from_fetch(mut self, call: usize) -> Self {
        self.fail_from_fetch = Some(call);
        self
    }

    pub fn fail_stream_after(mut self, chunks: usize) -> Self {
        self.fail_stream_after = Some(chunks);
        self
    }

    /// Every page fetch waits `delay` before answering.
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn streams_opened(&self) -> usize {
        self.streams_opened.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn rows_after(&self, cursor: Cursor) -> Vec<RawRecord> {
        self.rows
            .iter()
            .filter(|r| cursor.admits(r.id))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DataSource for MemorySource {
    fn describe(&self) -> String {
        format!("memory source ({} rows)", self.rows.len())
    }

    async fn fetch_page(&self, cursor: Cursor, limit: usize) -> Result<Page, ConnectorError> {
        let call = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_from_fetch.is_some_and(|from| call >= from) {
            return Err(ConnectorError::Other("relation \"origin_table\" vanished".into()));
        }

        let mut rows = self.rows_after(cursor);
        rows.truncate(limit);
        Ok(Page::from_fetch(rows, limit))
    }

    async fn open_stream(
        &self,
        cursor: Cursor,
        chunk_size: usize,
    ) -> Result<RecordStream, ConnectorError> {
        self.streams_opened.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows_after(cursor);
        let fail_after = self.fail_stream_after;

        Ok(RecordStream::spawn(move |tx| async move {
            for (index, chunk) in rows.chunks(chunk_size.max(1)).enumerate() {
                if fail_after == Some(index) {
                    return Err(transient("server closed the cursor"));
                }
                tx.send(chunk.to_vec()).await?;
            }
            Ok::<(), ConnectorError>(())
        }))
    }

    async fn close(&self) -> Result<(), ConnectorError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// A destination table held in memory that records every write attempt.
#[derive(Default)]
pub struct MemoryDestination {
    rows: Mutex<Vec<NormalizedRecord>>,
    attempts: Mutex<Vec<u64>>,
    commits: Mutex<Vec<(u64, usize)>>,
    /// Batches that always fail with a non-retryable error.
    fail_seqs: HashSet<u64>,
    /// Batches whose write panics inside the destination.
    panic_seqs: HashSet<u64>,
    /// Batches that fail with a transient error this many times first.
    flaky_seqs: Mutex<HashMap<u64, usize>>,
    /// Batches whose first attempt commits but reports a timeout.
    ambiguous_seqs: Mutex<HashSet<u64>>,
    write_delay: Option<Duration>,
    cancel_after_commit: Option<(u64, CancellationToken)>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    closed: AtomicBool,
}

impl MemoryDestination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(mut self, seq: u64) -> Self {
        self.fail_seqs.insert(seq);
        self
    }

    pub fn panic_on(mut self, seq: u64) -> Self {
        self.panic_seqs.insert(seq);
        self
    }

    pub fn flaky_on(self, seq: u64, failures: usize) -> Self {
        lock(&self.flaky_seqs).insert(seq, failures);
        self
    }

    pub fn ambiguous_on(self, seq: u64) -> Self {
        lock(&self.ambiguous_seqs).insert(seq);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    /// Cancels `token` once batch `seq` has committed.
    pub fn cancel_after(mut self, seq: u64, token: CancellationToken) -> Self {
        self.cancel_after_commit = Some((seq, token));
        self
    }

    pub fn rows(&self) -> Vec<NormalizedRecord> {
        lock(&self.rows).clone()
    }

    /// Batch seqs in the order write attempts started.
    pub fn attempts(&self) -> Vec<u64> {
        lock(&self.attempts).clone()
    }

    /// `(seq, rows)` in commit order.
    pub fn commits(&self) -> Vec<(u64, usize)> {
        lock(&self.commits).clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn commit(&self, batch: &Batch) {
        lock(&self.rows).extend(batch.records().iter().cloned());
        lock(&self.commits).push((batch.seq(), batch.len()));
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DataDestination for MemoryDestination {
    fn describe(&self) -> String {
        "memory destination".into()
    }

    async fn write_batch(&self, batch: &Batch) -> Result<(), ConnectorError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        lock(&self.attempts).push(batch.seq());

        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }

        if self.panic_seqs.contains(&batch.seq()) {
            panic!("destination crashed while writing batch {}", batch.seq());
        }

        if self.fail_seqs.contains(&batch.seq()) {
            return Err(ConnectorError::Other(format!(
                "duplicate key value violates unique constraint (batch {})",
                batch.seq()
            )));
        }

        {
            let mut flaky = lock(&self.flaky_seqs);
            if let Some(remaining) = flaky.get_mut(&batch.seq())
                && *remaining > 0
            {
                *remaining -= 1;
                return Err(transient("connection reset by peer"));
            }
        }

        if lock(&self.ambiguous_seqs).remove(&batch.seq()) {
            self.commit(batch);
            return Err(ConnectorError::Timeout(Duration::from_secs(30)));
        }

        self.commit(batch);

        if let Some((seq, token)) = &self.cancel_after_commit
            && *seq == batch.seq()
        {
            token.cancel();
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), ConnectorError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// The rows a correct transfer of `source` must produce, in source order.
pub fn expected_image(rows: &[RawRecord], delimiter: &str) -> Vec<NormalizedRecord> {
    rows.iter()
        .filter_map(|r| r.text.as_deref())
        .map(|text| {
            let mut parts = text.splitn(3, delimiter);
            NormalizedRecord::new(
                parts.next().unwrap_or_default(),
                parts.next().unwrap_or_default(),
            )
        })
        .collect()
}
