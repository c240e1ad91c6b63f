use connectors::error::ConnectorError;
use engine_config::settings::SettingsError;
use engine_processing::error::TransferError;
use model::progress::TransferProgress;
use thiserror::Error;

/// Top-level errors for a transfer run.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Settings were rejected before any connection was opened.
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Connecting to one of the endpoints failed.
    #[error("Failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: ConnectorError,
    },

    #[error(transparent)]
    Transfer(#[from] TransferError),
}

impl MigrationError {
    pub fn progress(&self) -> Option<&TransferProgress> {
        match self {
            MigrationError::Transfer(err) => err.progress(),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            MigrationError::Transfer(TransferError::Cancelled { .. })
        )
    }
}
