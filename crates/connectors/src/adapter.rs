use crate::{
    destination::DataDestination,
    error::ConnectorError,
    source::DataSource,
    sql::{
        base::table::{DestTable, SourceTable},
        mysql::{adapter::MySqlAdapter, destination::MySqlDestination, source::MySqlDataSource},
        postgres::{adapter::PgAdapter, destination::PgDestination, source::PgDataSource},
    },
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::Arc};

/// Supported database drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    MySql,
    Postgres,
}

impl DataFormat {
    /// Infers the driver from a connection URL scheme.
    pub fn from_url(url: &str) -> Result<Self, ConnectorError> {
        let scheme = url
            .split_once("://")
            .map(|(scheme, _)| scheme)
            .ok_or_else(|| ConnectorError::InvalidUrl(format!("missing scheme in '{}'", redact(url))))?;
        scheme.parse()
    }
}

impl FromStr for DataFormat {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(DataFormat::MySql),
            "pg" | "postgres" | "postgresql" => Ok(DataFormat::Postgres),
            other => Err(ConnectorError::InvalidUrl(format!(
                "unsupported driver '{other}'"
            ))),
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataFormat::MySql => write!(f, "mysql"),
            DataFormat::Postgres => write!(f, "postgres"),
        }
    }
}

/// A connected database handle.
#[derive(Clone)]
pub enum Adapter {
    MySql(MySqlAdapter),
    Postgres(PgAdapter),
}

impl Adapter {
    /// Connects to `url`; MySQL pools are capped at `max_connections`.
    pub async fn sql(url: &str, max_connections: usize) -> Result<Self, ConnectorError> {
        match DataFormat::from_url(url)? {
            DataFormat::MySql => Ok(Adapter::MySql(MySqlAdapter::connect(
                url,
                max_connections,
            )?)),
            DataFormat::Postgres => Ok(Adapter::Postgres(PgAdapter::connect(url).await?)),
        }
    }

    pub fn format(&self) -> DataFormat {
        match self {
            Adapter::MySql(_) => DataFormat::MySql,
            Adapter::Postgres(_) => DataFormat::Postgres,
        }
    }

    pub async fn ping(&self) -> Result<(), ConnectorError> {
        match self {
            Adapter::MySql(adapter) => adapter.ping().await,
            Adapter::Postgres(adapter) => adapter.ping().await,
        }
    }

    pub fn into_source(self, table: SourceTable) -> Result<Arc<dyn DataSource>, ConnectorError> {
        table.validate()?;
        Ok(match self {
            Adapter::MySql(adapter) => Arc::new(MySqlDataSource::new(adapter, table)),
            Adapter::Postgres(adapter) => Arc::new(PgDataSource::new(adapter, table)),
        })
    }

    pub fn into_destination(
        self,
        table: DestTable,
    ) -> Result<Arc<dyn DataDestination>, ConnectorError> {
        table.validate()?;
        Ok(match self {
            Adapter::MySql(adapter) => Arc::new(MySqlDestination::new(adapter, table)),
            Adapter::Postgres(adapter) => Arc::new(PgDestination::new(adapter, table)),
        })
    }
}

/// Hides the password component of a connection URL for logging.
pub fn redact(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    match rest.rsplit_once('@') {
        Some((creds, host)) => {
            let user = creds.split(':').next().unwrap_or_default();
            format!("{scheme}://{user}:***@{host}")
        }
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_url() {
        assert_eq!(
            DataFormat::from_url("mysql://u:p@localhost:3306/db").unwrap(),
            DataFormat::MySql
        );
        assert_eq!(
            DataFormat::from_url("postgres://u@localhost/db").unwrap(),
            DataFormat::Postgres
        );
        assert!(DataFormat::from_url("sqlite://file.db").is_err());
        assert!(DataFormat::from_url("localhost:3306").is_err());
    }

    #[test]
    fn test_redact_hides_password() {
        assert_eq!(
            redact("mysql://root:secret@db:3306/app"),
            "mysql://root:***@db:3306/app"
        );
        assert_eq!(redact("postgres://db/app"), "postgres://db/app");
    }
}
