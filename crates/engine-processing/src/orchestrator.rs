use crate::{
    accumulator::BatchAccumulator,
    error::TransferError,
    reader::SourceReader,
    transform::{RowTransform, SplitTransform},
    writer::{BatchWriter, WriteResult},
};
use connectors::{destination::DataDestination, error::ConnectorError, source::DataSource};
use engine_config::settings::{FailurePolicy, TransferSettings};
use engine_core::{metrics::Metrics, retry::RetryPolicy};
use model::{
    progress::TransferProgress,
    records::{batch::Batch, normalized::Mapped},
};
use std::{collections::HashMap, fmt, sync::Arc};
use tokio::task::{self, JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    /// Reading has stopped; waiting for in-flight writes.
    Draining,
    Completed,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Draining => "draining",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Identity of a dispatched batch, kept apart from the batch itself so it
/// survives a write task that panicked.
#[derive(Debug, Clone, Copy, Default)]
struct BatchRef {
    seq: u64,
    first_id: u64,
    last_id: u64,
    rows: usize,
}

impl BatchRef {
    fn of(batch: &Batch) -> Self {
        Self {
            seq: batch.seq(),
            first_id: batch.first_id(),
            last_id: batch.last_id(),
            rows: batch.len(),
        }
    }
}

/// Outcome of one spawned write, reported back to the control loop.
struct WriteOutcome {
    batch: BatchRef,
    result: Result<WriteResult, TransferError>,
}

/// Write tasks in flight.
#[derive(Default)]
struct WriteWindow {
    tasks: JoinSet<WriteOutcome>,
    batches: HashMap<task::Id, BatchRef>,
}

impl WriteWindow {
    fn len(&self) -> usize {
        self.tasks.len()
    }

    fn spawn<F>(&mut self, batch: BatchRef, write: F)
    where
        F: Future<Output = WriteOutcome> + Send + 'static,
    {
        let handle = self.tasks.spawn(write);
        self.batches.insert(handle.id(), batch);
    }

    async fn join_next(&mut self) -> Option<WriteOutcome> {
        let joined = self.tasks.join_next_with_id().await?;
        Some(self.settle(joined))
    }

    /// A write that has already finished, without waiting for one.
    fn try_join_next(&mut self) -> Option<WriteOutcome> {
        let joined = self.tasks.try_join_next_with_id()?;
        Some(self.settle(joined))
    }

    fn settle(&mut self, joined: Result<(task::Id, WriteOutcome), JoinError>) -> WriteOutcome {
        match joined {
            Ok((id, outcome)) => {
                self.batches.remove(&id);
                outcome
            }
            Err(join_err) => {
                let batch = self.batches.remove(&join_err.id()).unwrap_or_default();
                WriteOutcome {
                    batch,
                    result: Err(TransferError::WriteFailure {
                        seq: batch.seq,
                        first_id: batch.first_id,
                        last_id: batch.last_id,
                        source: ConnectorError::Other(format!("write task failed: {join_err}")),
                    }),
                }
            }
        }
    }
}

/// Drives a transfer: read, transform, accumulate, write.
///
/// A single control loop owns the reader and the accumulator. Sealed batches
/// are handed to spawned write tasks; at most `concurrency_limit` of them are
/// in flight, and the loop stops reading while the window is full.
pub struct TransferOrchestrator {
    reader: SourceReader,
    transform: Arc<dyn RowTransform>,
    accumulator: BatchAccumulator,
    writer: Arc<BatchWriter>,
    write_retry: RetryPolicy,
    concurrency_limit: usize,
    failure_policy: FailurePolicy,
    metrics: Metrics,
    cancel: CancellationToken,
    state: RunState,
}

impl TransferOrchestrator {
    pub fn new(
        source: Arc<dyn DataSource>,
        destination: Arc<dyn DataDestination>,
        settings: &TransferSettings,
    ) -> Result<Self, TransferError> {
        settings.validate()?;

        let reader = SourceReader::new(
            source,
            settings.read_strategy(),
            settings.source_batch_size(),
        )?
        .with_timeout(settings.read_timeout())
        .with_retry(settings.read_retry_policy())
        .with_row_limit(settings.row_limit())
        .starting_after(settings.start_after_id());

        Ok(Self {
            reader,
            transform: Arc::new(SplitTransform::new(settings.delimiter())),
            accumulator: BatchAccumulator::new(settings.write_batch_size()),
            writer: Arc::new(BatchWriter::new(destination, settings.write_timeout())),
            write_retry: settings.write_retry_policy(),
            concurrency_limit: settings.concurrency_limit(),
            failure_policy: settings.failure_policy(),
            metrics: Metrics::for_new_run(),
            cancel: CancellationToken::new(),
            state: RunState::Idle,
        })
    }

    /// Replaces the default split transform.
    pub fn with_transform(mut self, transform: Arc<dyn RowTransform>) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Live counters; clones share state with the running transfer.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub async fn run(&mut self) -> Result<TransferProgress, TransferError> {
        if self.state != RunState::Idle {
            return Err(TransferError::InvalidRequest(format!(
                "transfer already ran (state: {})",
                self.state
            )));
        }

        info!(
            run_id = self.metrics.run_id(),
            source = %self.reader.describe_source(),
            destination = %self.writer.destination().describe(),
            write_batch_size = self.accumulator.capacity(),
            concurrency_limit = self.concurrency_limit,
            failure_policy = %self.failure_policy,
            "Starting transfer"
        );
        self.transition(RunState::Running);

        let mut window = WriteWindow::default();
        let mut failure: Option<TransferError> = None;
        let mut cancelled = false;

        'read: loop {
            self.reap(&mut window, &mut failure);
            if failure.is_some() {
                break 'read;
            }

            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    cancelled = true;
                    break 'read;
                }
                next = self.reader.next_chunk() => next,
            };

            let records = match next {
                Ok(Some(records)) => records,
                Ok(None) => break 'read,
                Err(err) => {
                    error!(
                        cursor = %self.reader.cursor(),
                        error = %err,
                        "Source read failed, stopping"
                    );
                    self.metrics.record_error(err.to_string());
                    failure = Some(err);
                    break 'read;
                }
            };

            self.metrics.add_rows_read(records.len() as u64);

            for raw in records {
                let id = raw.id;
                match self.transform.apply(raw) {
                    Mapped::Record(record) => {
                        if let Some(batch) = self.accumulator.push(id, record) {
                            self.dispatch(batch, &mut window, &mut failure).await;
                            if failure.is_some() {
                                break 'read;
                            }
                        }
                    }
                    Mapped::Unmappable { id, reason } => {
                        debug!(id, reason = %reason, "Dropping unmappable row");
                        self.metrics.add_unmappable(1);
                    }
                }
            }
        }

        if failure.is_none()
            && !cancelled
            && let Some(batch) = self.accumulator.flush()
        {
            self.dispatch(batch, &mut window, &mut failure).await;
        }

        self.transition(RunState::Draining);
        while let Some(outcome) = window.join_next().await {
            self.complete(outcome, &mut failure);
        }

        self.reader.release();

        let progress = self.metrics.finish();
        self.finish(progress, failure, cancelled)
    }

    fn finish(
        &mut self,
        progress: TransferProgress,
        failure: Option<TransferError>,
        cancelled: bool,
    ) -> Result<TransferProgress, TransferError> {
        if let Some(cause) = failure {
            self.transition(RunState::Failed);
            if progress.batches_committed > 0 {
                error!(
                    rows_read = progress.rows_read,
                    rows_written = progress.rows_written,
                    batches_committed = progress.batches_committed,
                    "Transfer failed after partial progress"
                );
                return Err(TransferError::PartialTransfer {
                    progress: Box::new(progress),
                    cause: Box::new(cause),
                });
            }
            return Err(cause);
        }

        if cancelled {
            self.transition(RunState::Failed);
            warn!(
                rows_read = progress.rows_read,
                rows_written = progress.rows_written,
                "Transfer cancelled"
            );
            return Err(TransferError::Cancelled {
                progress: Box::new(progress),
            });
        }

        self.transition(RunState::Completed);
        info!(
            run_id = %progress.run_id,
            rows_read = progress.rows_read,
            rows_written = progress.rows_written,
            rows_unmappable = progress.rows_unmappable,
            rows_skipped = progress.rows_skipped,
            batches_committed = progress.batches_committed,
            batches_skipped = progress.batches_skipped,
            retries = self.metrics.retries(),
            peak_in_flight = self.metrics.peak_in_flight(),
            "Transfer completed"
        );
        Ok(progress)
    }

    /// Hands `batch` to a write task once the window has a free slot. Under
    /// the abort policy a batch is never started after a failure was seen.
    async fn dispatch(
        &mut self,
        batch: Batch,
        window: &mut WriteWindow,
        failure: &mut Option<TransferError>,
    ) {
        self.reap(window, failure);
        while window.len() >= self.concurrency_limit {
            match window.join_next().await {
                Some(outcome) => self.complete(outcome, failure),
                None => break,
            }
        }

        if failure.is_some() && self.failure_policy == FailurePolicy::Abort {
            debug!(batch_seq = batch.seq(), "Not dispatching batch after failure");
            return;
        }

        self.metrics.batch_attempted();

        let writer = self.writer.clone();
        let retry = self.write_retry.clone();
        let metrics = self.metrics.clone();
        let batch_ref = BatchRef::of(&batch);
        window.spawn(
            batch_ref,
            async move {
                let result = writer.write_with_retry(&batch, &retry, &metrics).await;
                WriteOutcome {
                    batch: batch_ref,
                    result,
                }
            }
            .in_current_span(),
        );
    }

    /// Settles writes that already finished so a failure is seen before the
    /// next read or dispatch.
    fn reap(&mut self, window: &mut WriteWindow, failure: &mut Option<TransferError>) {
        while let Some(outcome) = window.try_join_next() {
            self.complete(outcome, failure);
        }
    }

    fn complete(&mut self, outcome: WriteOutcome, failure: &mut Option<TransferError>) {
        let err = match outcome.result {
            Ok(_) => return,
            Err(err) => err,
        };
        let BatchRef { seq, rows, .. } = outcome.batch;

        self.metrics.record_error(err.to_string());

        match self.failure_policy {
            FailurePolicy::BestEffort => {
                warn!(batch_seq = seq, rows, error = %err, "Skipping batch after write failure");
                self.metrics.batch_skipped(rows as u64);
            }
            FailurePolicy::Abort => {
                error!(batch_seq = seq, rows, error = %err, "Batch write failed, aborting");
                if failure.is_none() {
                    *failure = Some(err);
                }
            }
        }
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = %self.state, to = %next, "Transfer state change");
        self.state = next;
    }
}
