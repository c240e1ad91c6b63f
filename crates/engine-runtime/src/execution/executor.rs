use crate::{
    error::MigrationError,
    execution::factory::{self, Endpoints},
};
use connectors::{destination::DataDestination, source::DataSource};
use engine_config::settings::TransferSettings;
use engine_processing::orchestrator::TransferOrchestrator;
use model::progress::TransferProgress;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Connects to both endpoints and runs one transfer to completion,
/// failure or cancellation.
pub async fn run_transfer(
    settings: TransferSettings,
    endpoints: &Endpoints,
    cancel: CancellationToken,
) -> Result<TransferProgress, MigrationError> {
    settings.validate()?;

    let source = factory::create_source(&endpoints.source_url, &settings).await?;
    let destination = match factory::create_destination(&endpoints.destination_url, &settings).await
    {
        Ok(destination) => destination,
        Err(err) => {
            close_source(source.as_ref()).await;
            return Err(err);
        }
    };

    run_with_connectors(source, destination, &settings, cancel).await
}

/// Runs a transfer over already-connected endpoints, closing both afterwards.
pub async fn run_with_connectors(
    source: Arc<dyn DataSource>,
    destination: Arc<dyn DataDestination>,
    settings: &TransferSettings,
    cancel: CancellationToken,
) -> Result<TransferProgress, MigrationError> {
    info!(
        source = %source.describe(),
        destination = %destination.describe(),
        read_strategy = %settings.read_strategy(),
        "Running transfer"
    );

    let result = match TransferOrchestrator::new(source.clone(), destination.clone(), settings) {
        Ok(orchestrator) => {
            let mut orchestrator = orchestrator.with_cancellation(cancel);
            orchestrator.run().await.map_err(MigrationError::from)
        }
        Err(err) => Err(err.into()),
    };

    close_source(source.as_ref()).await;
    if let Err(err) = destination.close().await {
        warn!(error = %err, "Failed to close destination");
    }

    result
}

async fn close_source(source: &dyn DataSource) {
    if let Err(err) = source.close().await {
        warn!(error = %err, "Failed to close source");
    }
}
