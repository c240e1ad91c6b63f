use crate::{error::TransferError, retry::classify_connector_error};
use connectors::{destination::DataDestination, error::ConnectorError};
use engine_core::{metrics::Metrics, retry::RetryPolicy};
use model::records::batch::Batch;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::time::timeout;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct WriteResult {
    pub seq: u64,
    pub rows: usize,
    pub duration: Duration,
}

/// Writes sealed batches to the destination, one statement per batch.
pub struct BatchWriter {
    destination: Arc<dyn DataDestination>,
    timeout: Duration,
}

impl BatchWriter {
    pub fn new(destination: Arc<dyn DataDestination>, timeout: Duration) -> Self {
        Self {
            destination,
            timeout,
        }
    }

    pub fn destination(&self) -> &Arc<dyn DataDestination> {
        &self.destination
    }

    /// A single attempt under the write timeout. An expired deadline leaves
    /// the outcome unknown: the insert may still commit.
    pub async fn write(&self, batch: &Batch) -> Result<WriteResult, ConnectorError> {
        let start = Instant::now();

        debug!(
            batch_seq = batch.seq(),
            rows = batch.len(),
            first_id = batch.first_id(),
            last_id = batch.last_id(),
            bytes = batch.size_bytes(),
            queued_ms = batch.age().as_millis() as u64,
            "Writing batch to destination"
        );

        timeout(self.timeout, self.destination.write_batch(batch))
            .await
            .unwrap_or(Err(ConnectorError::Timeout(self.timeout)))?;

        let duration = start.elapsed();
        let rows = batch.len();
        let rows_per_sec = rows as f64 / duration.as_secs_f64().max(f64::EPSILON);

        info!(
            batch_seq = batch.seq(),
            rows,
            duration_ms = duration.as_millis() as u64,
            rows_per_sec = %format!("{:.2}", rows_per_sec),
            "Batch written successfully"
        );

        Ok(WriteResult {
            seq: batch.seq(),
            rows,
            duration,
        })
    }

    /// Writes `batch`, retrying transient failures under `retry`.
    ///
    /// Delivery is at-least-once: a retried write whose earlier attempt
    /// committed before failing leaves duplicate rows behind.
    pub async fn write_with_retry(
        &self,
        batch: &Batch,
        retry: &RetryPolicy,
        metrics: &Metrics,
    ) -> Result<WriteResult, TransferError> {
        let _in_flight = metrics.enter_write();

        let result = retry
            .run_observed(
                || self.write(batch),
                classify_connector_error,
                |_, _| metrics.increment_retries(),
            )
            .await
            .map_err(|err| TransferError::WriteFailure {
                seq: batch.seq(),
                first_id: batch.first_id(),
                last_id: batch.last_id(),
                source: err.into_inner(),
            })?;

        metrics.batch_committed(result.rows as u64);
        Ok(result)
    }
}
