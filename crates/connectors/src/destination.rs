use crate::error::ConnectorError;
use async_trait::async_trait;
use model::records::batch::Batch;

/// A table accepting bulk inserts of `(part1, part2)` pairs.
///
/// Implementations must tolerate concurrent `write_batch` calls for disjoint
/// batches.
#[async_trait]
pub trait DataDestination: Send + Sync {
    fn describe(&self) -> String;

    /// Inserts every record of `batch` in a single statement.
    async fn write_batch(&self, batch: &Batch) -> Result<(), ConnectorError>;

    async fn close(&self) -> Result<(), ConnectorError> {
        Ok(())
    }
}
