use engine_config::settings::SettingsError;
use engine_runtime::error::MigrationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// An environment variable or flag held a value that does not parse.
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidOption {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Missing required option: {0}")]
    MissingOption(&'static str),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Transfer failed: {0}")]
    Migration(#[from] MigrationError),
}
