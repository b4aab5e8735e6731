//! Error types for PostgreSQL operations.

use strata_migrate::MigrationError;
use thiserror::Error;

/// Result type for PostgreSQL operations.
pub type PgResult<T> = Result<T, PgError>;

/// Errors that can occur during PostgreSQL operations.
#[derive(Error, Debug)]
pub enum PgError {
    /// PostgreSQL error.
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Catalog row had an unexpected shape.
    #[error("query error: {0}")]
    Query(String),
}

impl PgError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a query error.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    /// Check if this is a connection error.
    ///
    /// Server errors carry an SQLSTATE code; anything without one failed
    /// below the protocol (socket, TLS, closed connection).
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Postgres(e) => e.is_closed() || e.code().is_none(),
            _ => false,
        }
    }
}

impl From<PgError> for MigrationError {
    fn from(err: PgError) -> Self {
        if err.is_connection_error() {
            MigrationError::connection(err.to_string())
        } else {
            MigrationError::database(err.to_string())
        }
    }
}
