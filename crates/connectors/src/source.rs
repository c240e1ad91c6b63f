use crate::{error::ConnectorError, stream::RecordStream};
use async_trait::async_trait;
use model::pagination::{cursor::Cursor, page::Page};

/// A table of `(id, text)` rows read in ascending id order.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Short human-readable name used in logs.
    fn describe(&self) -> String;

    /// Reads up to `limit` rows strictly after `cursor`.
    ///
    /// Stateless and idempotent, so safe to retry.
    async fn fetch_page(&self, cursor: Cursor, limit: usize) -> Result<Page, ConnectorError>;

    /// Opens a single-use stream over all rows after `cursor`.
    async fn open_stream(
        &self,
        cursor: Cursor,
        chunk_size: usize,
    ) -> Result<RecordStream, ConnectorError>;

    /// Releases pooled connections.
    async fn close(&self) -> Result<(), ConnectorError> {
        Ok(())
    }
}
