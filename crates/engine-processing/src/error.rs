use connectors::error::ConnectorError;
use engine_config::settings::SettingsError;
use model::{pagination::cursor::Cursor, progress::TransferProgress};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransferError {
    /// Bad parameters, rejected before any I/O.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Source unavailable at cursor ({cursor}): {source}")]
    SourceUnavailable {
        cursor: Cursor,
        #[source]
        source: ConnectorError,
    },

    #[error("Failed to write batch #{seq} (ids {first_id}..={last_id}): {source}")]
    WriteFailure {
        seq: u64,
        first_id: u64,
        last_id: u64,
        #[source]
        source: ConnectorError,
    },

    /// Some batches were committed before the run failed. Committed rows stay
    /// in the destination.
    #[error(
        "Transfer stopped after writing {} of {} rows read: {cause}",
        .progress.rows_written,
        .progress.rows_read
    )]
    PartialTransfer {
        progress: Box<TransferProgress>,
        #[source]
        cause: Box<TransferError>,
    },

    #[error("Transfer cancelled after writing {} rows", .progress.rows_written)]
    Cancelled { progress: Box<TransferProgress> },
}

impl TransferError {
    /// Progress at the point the run ended, when the error carries it.
    pub fn progress(&self) -> Option<&TransferProgress> {
        match self {
            TransferError::PartialTransfer { progress, .. }
            | TransferError::Cancelled { progress } => Some(progress),
            _ => None,
        }
    }

    /// The error that actually stopped the run.
    pub fn root_cause(&self) -> &TransferError {
        match self {
            TransferError::PartialTransfer { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}

impl From<SettingsError> for TransferError {
    fn from(err: SettingsError) -> Self {
        TransferError::InvalidRequest(err.to_string())
    }
}
