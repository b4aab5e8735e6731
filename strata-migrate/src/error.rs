//! Error types for the migration engine.

use strata_schema::SchemaError;
use thiserror::Error;

use crate::validate::ValidationError;

/// Result type alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrationError>;

/// Errors that can occur during migration operations.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The diff is structurally invalid. Raised before any SQL is generated.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Foreign keys form a cycle, so no creation order exists.
    #[error("circular dependency detected at table {table}")]
    Dependency {
        /// A table on the cycle.
        table: String,
    },

    /// A requested rename does not match the schemas being compared.
    #[error("Invalid rename: {0}")]
    InvalidRename(String),

    /// Reading the live schema failed.
    #[error("Introspection failed: {0}")]
    Introspection(String),

    /// Connecting to the database failed. Safe to retry.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A statement failed while applying a migration. The migration was rolled back.
    #[error("Failed to apply migration '{version}': {message}")]
    Apply {
        /// Version of the migration that failed.
        version: String,
        /// Underlying database message.
        message: String,
    },

    /// Database operation error.
    #[error("Database error: {0}")]
    Database(String),

    /// Schema loading error.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid migration file or format.
    #[error("Invalid migration: {0}")]
    InvalidMigration(String),

    /// Migration checksum mismatch.
    #[error("Checksum mismatch for migration '{version}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Migration version.
        version: String,
        /// Checksum recorded when applied.
        expected: String,
        /// Checksum of the file on disk.
        actual: String,
    },

    /// Migration not found.
    #[error("Migration '{0}' not found")]
    NotFound(String),

    /// No changes to migrate.
    #[error("No schema changes detected")]
    NoChanges,
}

impl MigrationError {
    /// Create a dependency error for a table on a cycle.
    pub fn dependency(table: impl Into<String>) -> Self {
        Self::Dependency {
            table: table.into(),
        }
    }

    /// Create an introspection error.
    pub fn introspection(msg: impl Into<String>) -> Self {
        Self::Introspection(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create an apply error.
    pub fn apply(version: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Apply {
            version: version.into(),
            message: message.into(),
        }
    }

    /// Create a database error.
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a migration file error.
    pub fn migration_file(msg: impl Into<String>) -> Self {
        Self::InvalidMigration(msg.into())
    }

    /// Whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Check if this is a recoverable error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoChanges | Self::Connection(_) | Self::Validation(ValidationError::NoChanges)
        )
    }
}
