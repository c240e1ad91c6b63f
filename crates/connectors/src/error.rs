use thiserror::Error;

/// Errors raised by source and destination connectors.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Low-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// MySQL driver error.
    #[error("MySQL error: {0}")]
    MySql(#[from] mysql_async::Error),

    /// PostgreSQL driver error.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// TLS setup for a PostgreSQL connection failed.
    #[error("TLS configuration error: {0}")]
    TlsConfig(#[from] native_tls::Error),

    #[error("Invalid connection URL: {0}")]
    InvalidUrl(String),

    /// A table or column name that cannot be safely quoted.
    #[error("Invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    /// A streamed read failed earlier; the stream cannot be resumed.
    #[error("Record stream was invalidated by an earlier failure")]
    StreamInvalidated,

    /// The producer side of a stream went away without finishing.
    #[error("Record stream closed unexpectedly")]
    Closed,

    /// A call did not complete within its deadline. The outcome on the
    /// server side is unknown.
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// A value in the source row could not be decoded.
    #[error("Failed to decode row: {0}")]
    Decode(String),

    #[error("Unexpected error: {0}")]
    Other(String),
}
