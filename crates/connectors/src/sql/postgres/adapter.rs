use crate::{error::ConnectorError, sql::postgres::utils::connect_client};
use std::sync::Arc;
use tokio_postgres::Client;
use tracing::info;

/// Shared PostgreSQL client.
///
/// `tokio_postgres::Client` pipelines statements issued concurrently through
/// `&self`, so clones of the adapter can write disjoint batches in parallel
/// without an outer lock.
#[derive(Clone)]
pub struct PgAdapter {
    client: Arc<Client>,
}

impl PgAdapter {
    pub async fn connect(url: &str) -> Result<Self, ConnectorError> {
        let client = connect_client(url).await?;
        Ok(PgAdapter {
            client: Arc::new(client),
        })
    }

    pub fn client(&self) -> Arc<Client> {
        self.client.clone()
    }

    pub async fn ping(&self) -> Result<(), ConnectorError> {
        let row = self.client.query_one("SELECT 1", &[]).await?;
        let val: i32 = row.try_get(0)?;
        info!(result = val, "Postgres ping succeeded");
        Ok(())
    }
}
