use crate::error::ConnectorError;
use mysql_async::{Conn, Opts, OptsBuilder, Pool, PoolConstraints, PoolOpts, prelude::*};
use tracing::{debug, info};

/// Owned handle to a MySQL connection pool.
///
/// Cloning shares the pool. Each checkout yields an independent connection,
/// so concurrent writers do not serialize on one link.
#[derive(Clone)]
pub struct MySqlAdapter {
    pool: Pool,
}

impl MySqlAdapter {
    /// Builds a pool capped at `max_connections`. Connections open lazily.
    pub fn connect(url: &str, max_connections: usize) -> Result<Self, ConnectorError> {
        let opts = Opts::from_url(url).map_err(|e| ConnectorError::InvalidUrl(e.to_string()))?;
        let constraints = PoolConstraints::new(0, max_connections.max(1)).unwrap_or_default();
        let opts = OptsBuilder::from_opts(opts)
            .pool_opts(PoolOpts::default().with_constraints(constraints));

        debug!(max_connections, "Created MySQL connection pool");
        Ok(MySqlAdapter {
            pool: Pool::new(opts),
        })
    }

    pub async fn get_conn(&self) -> Result<Conn, ConnectorError> {
        Ok(self.pool.get_conn().await?)
    }

    /// Round-trips `SELECT 1` on a fresh checkout.
    pub async fn ping(&self) -> Result<(), ConnectorError> {
        let mut conn = self.get_conn().await?;
        let val: Option<i32> = conn.query_first("SELECT 1").await?;
        info!(result = ?val, "MySQL ping succeeded");
        Ok(())
    }

    /// Closes every pooled connection. Outstanding checkouts finish first.
    pub async fn disconnect(&self) -> Result<(), ConnectorError> {
        self.pool.clone().disconnect().await?;
        debug!("MySQL connection pool closed");
        Ok(())
    }
}
