//! Error types for building and loading schemas.

// These warnings are false positives - the fields are used by derive macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur while building or loading a canonical schema.
#[derive(Error, Debug, Diagnostic)]
pub enum SchemaError {
    /// Error reading a schema document.
    #[error("failed to read file: {path}")]
    #[diagnostic(code(strata::schema::io_error))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML schema document")]
    #[diagnostic(code(strata::schema::toml_error))]
    Toml {
        #[source]
        source: toml::de::Error,
    },

    /// JSON parsing error.
    #[error("failed to parse JSON schema document")]
    #[diagnostic(code(strata::schema::json_error))]
    Json {
        #[source]
        source: serde_json::Error,
    },

    /// Serializing a schema document failed.
    #[error("failed to serialize schema: {message}")]
    #[diagnostic(code(strata::schema::serialize_error))]
    Serialize { message: String },

    /// The document extension is not recognized.
    #[error("unsupported schema document `{path}`")]
    #[diagnostic(
        code(strata::schema::unsupported_format),
        help("use a `.toml` or `.json` file")
    )]
    UnsupportedFormat { path: String },

    /// Two tables normalize to the same name.
    #[error("duplicate table `{name}`")]
    #[diagnostic(code(strata::schema::duplicate_table))]
    DuplicateTable { name: String },

    /// Two columns of one table normalize to the same name.
    #[error("duplicate column `{table}.{column}`")]
    #[diagnostic(code(strata::schema::duplicate_column))]
    DuplicateColumn { table: String, column: String },

    /// More than one column is flagged as primary key.
    #[error("table `{table}` declares more than one primary key column: {columns}")]
    #[diagnostic(
        code(strata::schema::multiple_primary_keys),
        help("composite primary keys are not supported")
    )]
    MultiplePrimaryKeys { table: String, columns: String },
}

impl SchemaError {
    /// Create a duplicate table error.
    pub fn duplicate_table(name: impl Into<String>) -> Self {
        Self::DuplicateTable { name: name.into() }
    }

    /// Create a duplicate column error.
    pub fn duplicate_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::DuplicateColumn {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl From<toml::de::Error> for SchemaError {
    fn from(source: toml::de::Error) -> Self {
        Self::Toml { source }
    }
}

impl From<serde_json::Error> for SchemaError {
    fn from(source: serde_json::Error) -> Self {
        Self::Json { source }
    }
}

#[cfg(test)]
#[allow(unused_assignments)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_table_display() {
        let err = SchemaError::duplicate_table("Users");
        let display = err.to_string();
        assert!(display.contains("duplicate table"));
        assert!(display.contains("Users"));
    }

    #[test]
    fn test_duplicate_column_display() {
        let err = SchemaError::duplicate_column("users", "email");
        assert_eq!(err.to_string(), "duplicate column `users.email`");
    }

    #[test]
    fn test_multiple_primary_keys_display() {
        let err = SchemaError::MultiplePrimaryKeys {
            table: "users".to_string(),
            columns: "id, uuid".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("users"));
        assert!(display.contains("id, uuid"));
    }

    #[test]
    fn test_io_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = SchemaError::Io {
            path: "schema.toml".to_string(),
            source: io_err,
        };
        assert!(err.to_string().contains("schema.toml"));
    }

    #[test]
    fn test_diagnostic_code() {
        let err = SchemaError::duplicate_table("users");
        let code = err.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("strata::schema::duplicate_table"));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= broken").unwrap_err();
        let err: SchemaError = toml_err.into();
        assert!(matches!(err, SchemaError::Toml { .. }));
    }
}
