use crate::error::MigrationError;
use connectors::{
    adapter::{Adapter, DataFormat, redact},
    destination::DataDestination,
    source::DataSource,
};
use engine_config::settings::TransferSettings;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Connection URLs for both sides of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub source_url: String,
    pub destination_url: String,
}

impl Endpoints {
    pub fn new(source_url: impl Into<String>, destination_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            destination_url: destination_url.into(),
        }
    }
}

pub async fn create_source(
    url: &str,
    settings: &TransferSettings,
) -> Result<Arc<dyn DataSource>, MigrationError> {
    let adapter = connect(url, settings.max_connections()).await?;
    adapter
        .into_source(settings.source_table().clone())
        .map_err(|source| MigrationError::Connect {
            endpoint: redact(url),
            source,
        })
}

pub async fn create_destination(
    url: &str,
    settings: &TransferSettings,
) -> Result<Arc<dyn DataDestination>, MigrationError> {
    let adapter = connect(url, settings.max_connections()).await?;
    adapter
        .into_destination(settings.dest_table().clone())
        .map_err(|source| MigrationError::Connect {
            endpoint: redact(url),
            source,
        })
}

/// Opens a connection to `url` and checks it answers.
pub async fn test_connection(url: &str) -> Result<DataFormat, MigrationError> {
    let adapter = connect(url, 1).await?;
    adapter.ping().await.map_err(|source| MigrationError::Connect {
        endpoint: redact(url),
        source,
    })?;
    Ok(adapter.format())
}

async fn connect(url: &str, max_connections: usize) -> Result<Adapter, MigrationError> {
    let endpoint = redact(url);
    let adapter = Adapter::sql(url, max_connections)
        .await
        .map_err(|source| MigrationError::Connect {
            endpoint: endpoint.clone(),
            source,
        })?;
    info!(endpoint = %endpoint, format = %adapter.format(), "Connected");
    Ok(adapter)
}
