use crate::{error::TransferError, retry::classify_connector_error};
use connectors::{error::ConnectorError, source::DataSource, stream::RecordStream};
use engine_config::settings::ReadStrategy;
use engine_core::retry::RetryPolicy;
use model::{
    pagination::{cursor::Cursor, page::Page},
    records::raw::RawRecord,
};
use std::{sync::Arc, time::Duration};
use tokio::time::timeout;
use tracing::{debug, info};

/// Pulls raw rows from a [`DataSource`] in ascending id order.
///
/// Paginated reads are stateless keyset queries and are retried on transient
/// failures. Streamed reads hold one server cursor for the whole run and are
/// never retried: a failed stream cannot be resumed.
pub struct SourceReader {
    source: Arc<dyn DataSource>,
    strategy: ReadStrategy,
    page_size: usize,
    timeout: Duration,
    retry: RetryPolicy,
    row_limit: Option<u64>,
    cursor: Cursor,
    stream: Option<RecordStream>,
    rows_returned: u64,
    exhausted: bool,
}

impl SourceReader {
    pub fn new(
        source: Arc<dyn DataSource>,
        strategy: ReadStrategy,
        page_size: usize,
    ) -> Result<Self, TransferError> {
        if page_size == 0 {
            return Err(TransferError::InvalidRequest(
                "page size must be greater than zero".into(),
            ));
        }

        Ok(Self {
            source,
            strategy,
            page_size,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            row_limit: None,
            cursor: Cursor::Start,
            stream: None,
            rows_returned: 0,
            exhausted: false,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Stops after `limit` rows in total.
    pub fn with_row_limit(mut self, limit: Option<u64>) -> Self {
        self.row_limit = limit;
        self
    }

    /// Resumes strictly after `id` instead of the first row.
    pub fn starting_after(mut self, id: Option<u64>) -> Self {
        self.cursor = Cursor::from_last_id(id);
        self
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn rows_returned(&self) -> u64 {
        self.rows_returned
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn describe_source(&self) -> String {
        self.source.describe()
    }

    /// Stops reading and releases any open stream.
    pub fn release(&mut self) {
        self.finish();
    }

    /// Fetches one page starting at `cursor`, with timeout and retry.
    pub async fn fetch_page(&self, cursor: Cursor, limit: usize) -> Result<Page, TransferError> {
        if limit == 0 {
            return Err(TransferError::InvalidRequest(
                "page limit must be greater than zero".into(),
            ));
        }

        let source = &self.source;
        let deadline = self.timeout;
        let page = self
            .retry
            .run(
                || async move {
                    timeout(deadline, source.fetch_page(cursor, limit))
                        .await
                        .unwrap_or(Err(ConnectorError::Timeout(deadline)))
                },
                classify_connector_error,
            )
            .await
            .map_err(|err| TransferError::SourceUnavailable {
                cursor,
                source: err.into_inner(),
            })?;

        if let Some(first) = page.records.first()
            && !cursor.admits(first.id)
        {
            return Err(TransferError::SourceUnavailable {
                cursor,
                source: ConnectorError::Decode(format!(
                    "source returned id {} which is not after the cursor",
                    first.id
                )),
            });
        }

        Ok(page)
    }

    /// Next chunk of rows, or `None` once the source (or the row budget) is
    /// exhausted.
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<RawRecord>>, TransferError> {
        if self.exhausted {
            return Ok(None);
        }

        let budget = self.remaining_budget();
        if budget == 0 {
            info!(rows = self.rows_returned, "Row limit reached");
            self.finish();
            return Ok(None);
        }

        let chunk = match self.strategy {
            ReadStrategy::Paginated => self.next_page(budget).await?,
            ReadStrategy::Streamed => self.next_streamed(budget).await?,
        };

        match chunk {
            Some(records) if !records.is_empty() => {
                self.rows_returned += records.len() as u64;
                if let Some(last) = records.last() {
                    self.cursor = Cursor::After { id: last.id };
                }
                Ok(Some(records))
            }
            _ => {
                self.finish();
                Ok(None)
            }
        }
    }

    async fn next_page(&mut self, budget: usize) -> Result<Option<Vec<RawRecord>>, TransferError> {
        let limit = self.page_size.min(budget);
        let page = self.fetch_page(self.cursor, limit).await?;
        debug!(
            cursor = %self.cursor,
            limit,
            rows = page.records.len(),
            "Fetched page"
        );

        if page.next.is_none() {
            self.exhausted = true;
        }
        Ok(Some(page.records))
    }

    async fn next_streamed(
        &mut self,
        budget: usize,
    ) -> Result<Option<Vec<RawRecord>>, TransferError> {
        let cursor = self.cursor;
        let deadline = self.timeout;

        if self.stream.is_none() {
            let stream = timeout(deadline, self.source.open_stream(cursor, self.page_size))
                .await
                .unwrap_or(Err(ConnectorError::Timeout(deadline)))
                .map_err(|source| TransferError::SourceUnavailable { cursor, source })?;
            debug!(cursor = %cursor, chunk_size = self.page_size, "Opened record stream");
            self.stream = Some(stream);
        }

        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };

        let next = timeout(deadline, stream.next_chunk())
            .await
            .unwrap_or(Err(ConnectorError::Timeout(deadline)));

        match next {
            Ok(Some(mut records)) => {
                if records.len() > budget {
                    records.truncate(budget);
                    self.finish();
                }
                Ok(Some(records))
            }
            Ok(None) => Ok(None),
            Err(source) => {
                // A stream that failed once is unusable; release it now.
                self.stream = None;
                Err(TransferError::SourceUnavailable { cursor, source })
            }
        }
    }

    fn remaining_budget(&self) -> usize {
        match self.row_limit {
            Some(limit) => {
                usize::try_from(limit.saturating_sub(self.rows_returned)).unwrap_or(usize::MAX)
            }
            None => usize::MAX,
        }
    }

    /// Marks the reader exhausted and drops any open stream, which aborts its
    /// producer and returns the connection.
    fn finish(&mut self) {
        self.exhausted = true;
        self.stream = None;
    }
}
