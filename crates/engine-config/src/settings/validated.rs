use crate::settings::{
    error::SettingsError,
    strategy::{FailurePolicy, ReadStrategy},
};
use connectors::sql::base::{
    query::MAX_INSERT_ROWS,
    table::{DestTable, SourceTable},
};
use engine_core::retry::RetryPolicy;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_DELIMITER: &str = "_";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RETRIES: usize = 3;
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(200);

/// Immutable, validated configuration for one transfer run.
#[derive(Debug, Clone, Serialize)]
pub struct TransferSettings {
    source_batch_size: usize,
    write_batch_size: usize,
    row_limit: Option<u64>,
    concurrency_limit: usize,
    read_strategy: ReadStrategy,
    delimiter: String,
    failure_policy: FailurePolicy,
    start_after_id: Option<u64>,
    #[serde(with = "duration_ms")]
    read_timeout: Duration,
    #[serde(with = "duration_ms")]
    write_timeout: Duration,
    max_retries: usize,
    #[serde(with = "duration_ms")]
    retry_base_delay: Duration,
    source_table: SourceTable,
    dest_table: DestTable,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            source_batch_size: DEFAULT_BATCH_SIZE,
            write_batch_size: DEFAULT_BATCH_SIZE,
            row_limit: None,
            concurrency_limit: 1,
            read_strategy: ReadStrategy::default(),
            delimiter: DEFAULT_DELIMITER.to_string(),
            failure_policy: FailurePolicy::default(),
            start_after_id: None,
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            source_table: SourceTable::default(),
            dest_table: DestTable::default(),
        }
    }
}

impl TransferSettings {
    pub fn builder() -> TransferSettingsBuilder {
        TransferSettingsBuilder::default()
    }

    fn from_builder(builder: TransferSettingsBuilder) -> Self {
        let defaults = TransferSettings::default();
        Self {
            source_batch_size: builder
                .source_batch_size
                .unwrap_or(defaults.source_batch_size),
            write_batch_size: builder
                .write_batch_size
                .unwrap_or(defaults.write_batch_size),
            row_limit: builder.row_limit,
            concurrency_limit: builder
                .concurrency_limit
                .unwrap_or(defaults.concurrency_limit),
            read_strategy: builder.read_strategy.unwrap_or(defaults.read_strategy),
            delimiter: builder.delimiter.unwrap_or(defaults.delimiter),
            failure_policy: builder.failure_policy.unwrap_or(defaults.failure_policy),
            start_after_id: builder.start_after_id,
            read_timeout: builder.read_timeout.unwrap_or(defaults.read_timeout),
            write_timeout: builder.write_timeout.unwrap_or(defaults.write_timeout),
            max_retries: builder.max_retries.unwrap_or(defaults.max_retries),
            retry_base_delay: builder
                .retry_base_delay
                .unwrap_or(defaults.retry_base_delay),
            source_table: builder.source_table.unwrap_or(defaults.source_table),
            dest_table: builder.dest_table.unwrap_or(defaults.dest_table),
        }
    }

    /// Checks every bound before any connection is opened.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.source_batch_size == 0 {
            return Err(SettingsError::InvalidRequest(
                "source_batch_size must be greater than zero".into(),
            ));
        }
        if self.write_batch_size == 0 {
            return Err(SettingsError::InvalidRequest(
                "write_batch_size must be greater than zero".into(),
            ));
        }
        if self.write_batch_size > MAX_INSERT_ROWS {
            return Err(SettingsError::InvalidRequest(format!(
                "write_batch_size {} exceeds the {} rows a single insert can bind",
                self.write_batch_size, MAX_INSERT_ROWS
            )));
        }
        if self.concurrency_limit == 0 {
            return Err(SettingsError::InvalidRequest(
                "concurrency_limit must be at least 1".into(),
            ));
        }
        if self.delimiter.is_empty() {
            return Err(SettingsError::InvalidRequest(
                "delimiter must not be empty".into(),
            ));
        }
        if self.read_timeout.is_zero() || self.write_timeout.is_zero() {
            return Err(SettingsError::InvalidRequest(
                "timeouts must be greater than zero".into(),
            ));
        }

        self.source_table.validate()?;
        self.dest_table.validate()?;
        Ok(())
    }

    pub fn source_batch_size(&self) -> usize {
        self.source_batch_size
    }

    pub fn write_batch_size(&self) -> usize {
        self.write_batch_size
    }

    pub fn row_limit(&self) -> Option<u64> {
        self.row_limit
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    pub fn is_sequential(&self) -> bool {
        self.concurrency_limit == 1
    }

    pub fn read_strategy(&self) -> ReadStrategy {
        self.read_strategy
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    pub fn start_after_id(&self) -> Option<u64> {
        self.start_after_id
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn write_timeout(&self) -> Duration {
        self.write_timeout
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    pub fn source_table(&self) -> &SourceTable {
        &self.source_table
    }

    pub fn dest_table(&self) -> &DestTable {
        &self.dest_table
    }

    /// Policy for batch writes: the first attempt plus `max_retries`.
    pub fn write_retry_policy(&self) -> RetryPolicy {
        if self.max_retries == 0 {
            return RetryPolicy::none();
        }
        RetryPolicy::new(
            self.max_retries + 1,
            self.retry_base_delay,
            self.retry_base_delay * 16,
        )
    }

    /// Policy for paginated reads. Capped at a small fixed budget.
    pub fn read_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries.min(2) + 1,
            self.retry_base_delay,
            self.retry_base_delay * 4,
        )
    }

    /// Pool size for connectors: one connection per writer plus one reader.
    pub fn max_connections(&self) -> usize {
        self.concurrency_limit + 1
    }
}

#[derive(Debug, Default)]
pub struct TransferSettingsBuilder {
    pub source_batch_size: Option<usize>,
    pub write_batch_size: Option<usize>,
    pub row_limit: Option<u64>,
    pub concurrency_limit: Option<usize>,
    pub read_strategy: Option<ReadStrategy>,
    pub delimiter: Option<String>,
    pub failure_policy: Option<FailurePolicy>,
    pub start_after_id: Option<u64>,
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    pub max_retries: Option<usize>,
    pub retry_base_delay: Option<Duration>,
    pub source_table: Option<SourceTable>,
    pub dest_table: Option<DestTable>,
}

impl TransferSettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source_batch_size(mut self, size: usize) -> Self {
        self.source_batch_size = Some(size);
        self
    }

    pub fn write_batch_size(mut self, size: usize) -> Self {
        self.write_batch_size = Some(size);
        self
    }

    pub fn row_limit(mut self, limit: Option<u64>) -> Self {
        self.row_limit = limit;
        self
    }

    pub fn concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = Some(limit);
        self
    }

    pub fn read_strategy(mut self, strategy: ReadStrategy) -> Self {
        self.read_strategy = Some(strategy);
        self
    }

    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = Some(policy);
        self
    }

    pub fn start_after_id(mut self, id: Option<u64>) -> Self {
        self.start_after_id = id;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    pub fn max_retries(mut self, retries: usize) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = Some(delay);
        self
    }

    pub fn source_table(mut self, table: SourceTable) -> Self {
        self.source_table = Some(table);
        self
    }

    pub fn dest_table(mut self, table: DestTable) -> Self {
        self.dest_table = Some(table);
        self
    }

    pub fn build(self) -> Result<TransferSettings, SettingsError> {
        let settings = TransferSettings::from_builder(self);
        settings.validate()?;
        debug!(?settings, "Validated transfer settings");
        Ok(settings)
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }
}
