//! CLI error types and result alias.

// These warnings are false positives - the fields are used by derive macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use strata_migrate::MigrationError;
use strata_postgres::PgError;
use strata_schema::SchemaError;
use thiserror::Error;

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(strata::io))]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    #[diagnostic(code(strata::config))]
    Config(String),

    /// Declared schema could not be loaded
    #[error(transparent)]
    #[diagnostic(transparent)]
    Schema(#[from] SchemaError),

    /// Diff, validation, file or history failure
    #[error("{0}")]
    #[diagnostic(code(strata::migration))]
    Migration(#[from] MigrationError),

    /// Database error
    #[error("Database error: {0}")]
    #[diagnostic(
        code(strata::database),
        help("check DATABASE_URL and that the server is reachable")
    )]
    Database(#[from] PgError),

    /// Command error
    #[error("Command error: {0}")]
    #[diagnostic(code(strata::command))]
    Command(String),
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        CliError::Config(format!("Failed to parse TOML: {}", err))
    }
}

impl From<toml::ser::Error> for CliError {
    fn from(err: toml::ser::Error) -> Self {
        CliError::Config(format!("Failed to serialize TOML: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_error_keeps_message() {
        let err = CliError::from(MigrationError::NotFound("20240101000000".into()));
        assert_eq!(err.to_string(), "Migration '20240101000000' not found");
    }

    #[test]
    fn test_toml_error_is_config() {
        let err = toml::from_str::<toml::Value>("[database").unwrap_err();
        assert!(matches!(CliError::from(err), CliError::Config(_)));
    }
}
