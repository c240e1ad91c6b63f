use crate::error::CliError;
use connectors::adapter::redact;
use engine_config::settings::TransferSettings;
use engine_runtime::{Endpoints, error::MigrationError};
use model::progress::TransferProgress;
use serde::Serialize;

/// Final report of a `transfer` run.
#[derive(Debug, Serialize)]
pub struct TransferReport<'a> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<&'a TransferProgress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<'a> TransferReport<'a> {
    pub fn from_result(result: &'a Result<TransferProgress, MigrationError>) -> Self {
        match result {
            Ok(progress) => TransferReport {
                status: "completed",
                progress: Some(progress),
                error: None,
            },
            Err(err) => TransferReport {
                status: if err.is_cancelled() {
                    "cancelled"
                } else if err.progress().is_some() {
                    "partial"
                } else {
                    "failed"
                },
                progress: err.progress(),
                error: Some(err.to_string()),
            },
        }
    }
}

#[derive(Serialize)]
struct ResolvedConfig<'a> {
    source_url: String,
    destination_url: String,
    settings: &'a TransferSettings,
}

pub fn config_json(settings: &TransferSettings, endpoints: &Endpoints) -> Result<String, CliError> {
    let resolved = ResolvedConfig {
        source_url: redact(&endpoints.source_url),
        destination_url: redact(&endpoints.destination_url),
        settings,
    };
    Ok(serde_json::to_string_pretty(&resolved)?)
}

pub async fn emit_report(report: &TransferReport<'_>, path: Option<&str>) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(report)?;
    match path {
        Some(path) => tokio::fs::write(path, json).await?,
        None => println!("{json}"),
    }
    Ok(())
}
