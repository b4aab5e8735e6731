//! Structural validation of a diff before any SQL is generated.

use std::collections::HashSet;

use strata_schema::is_known_type;
use thiserror::Error;

use crate::diff::{SchemaDiff, TableDiff};

/// A structurally invalid diff.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("table name cannot be empty")]
    EmptyTableName,

    #[error("column name cannot be empty in table {table}")]
    EmptyColumnName { table: String },

    #[error("duplicate column name {column} in table {table}")]
    DuplicateColumn { table: String, column: String },

    #[error("unsupported column type {data_type} for column {column} in table {table}")]
    UnsupportedColumnType {
        table: String,
        column: String,
        data_type: String,
    },

    #[error("foreign key column {column} does not exist in table {table}")]
    UnknownForeignKeyColumn { table: String, column: String },

    #[error("foreign key on {table}.{column} references unknown table {referenced_table}")]
    UnknownReferencedTable {
        table: String,
        column: String,
        referenced_table: String,
    },

    #[error("index {index} references non-existent column {column} in table {table}")]
    UnknownIndexColumn {
        table: String,
        index: String,
        column: String,
    },

    #[error("no schema changes detected")]
    NoChanges,
}

impl ValidationError {
    /// Stable identifier for the failed check.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyTableName => "empty_table_name",
            Self::EmptyColumnName { .. } => "empty_column_name",
            Self::DuplicateColumn { .. } => "duplicate_column",
            Self::UnsupportedColumnType { .. } => "unsupported_column_type",
            Self::UnknownForeignKeyColumn { .. } => "unknown_foreign_key_column",
            Self::UnknownReferencedTable { .. } => "unknown_referenced_table",
            Self::UnknownIndexColumn { .. } => "unknown_index_column",
            Self::NoChanges => "no_changes",
        }
    }
}

/// Validates a [`SchemaDiff`].
///
/// Foreign keys may only reference tables created in the same diff, unless
/// the caller registers the tables that already exist with
/// [`with_existing_tables`](Self::with_existing_tables). Registered tables
/// follow the diff's renames and drops.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    existing_tables: HashSet<String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables foreign keys may reference besides the ones being created.
    pub fn with_existing_tables<S: AsRef<str>>(mut self, tables: impl IntoIterator<Item = S>) -> Self {
        self.existing_tables
            .extend(tables.into_iter().map(|t| t.as_ref().to_lowercase()));
        self
    }

    /// Run every check, returning the first failure.
    pub fn validate(&self, diff: &SchemaDiff) -> Result<(), ValidationError> {
        if diff.is_empty() {
            return Err(ValidationError::NoChanges);
        }

        let mut known: HashSet<String> = self.existing_tables.clone();
        for rename in &diff.tables_to_rename {
            if known.remove(&rename.from.to_lowercase()) {
                known.insert(rename.to.to_lowercase());
            }
        }
        for dropped in &diff.tables_to_drop {
            known.remove(&dropped.to_lowercase());
        }
        known.extend(diff.tables_to_create.iter().map(|t| t.name().to_lowercase()));

        for table in &diff.tables_to_create {
            if table.name().trim().is_empty() {
                return Err(ValidationError::EmptyTableName);
            }
            let columns = check_added_columns(table)?;
            check_references(table, &columns, &known)?;
        }

        for table in &diff.tables_to_modify {
            check_added_columns(table)?;
            let columns: HashSet<&str> = table.table.columns.iter().map(|c| c.name.as_str()).collect();
            check_references(table, &columns, &known)?;
        }

        Ok(())
    }
}

/// Validate a diff with no pre-existing tables.
pub fn validate(diff: &SchemaDiff) -> Result<(), ValidationError> {
    Validator::new().validate(diff)
}

/// Names, uniqueness and types of added columns. Returns the added names.
fn check_added_columns(table: &TableDiff) -> Result<HashSet<&str>, ValidationError> {
    let mut names = HashSet::new();
    for column in &table.columns_to_add {
        if column.name.trim().is_empty() {
            return Err(ValidationError::EmptyColumnName {
                table: table.name().to_string(),
            });
        }
        if !names.insert(column.name.as_str()) {
            return Err(ValidationError::DuplicateColumn {
                table: table.name().to_string(),
                column: column.name.clone(),
            });
        }
        if !is_known_type(&column.data_type) {
            return Err(ValidationError::UnsupportedColumnType {
                table: table.name().to_string(),
                column: column.name.clone(),
                data_type: column.data_type.clone(),
            });
        }
    }
    Ok(names)
}

/// Added foreign keys and indexes point at columns in `columns` and known tables.
fn check_references(
    table: &TableDiff,
    columns: &HashSet<&str>,
    known_tables: &HashSet<String>,
) -> Result<(), ValidationError> {
    for fk in &table.foreign_keys_to_add {
        if !columns.contains(fk.column.as_str()) {
            return Err(ValidationError::UnknownForeignKeyColumn {
                table: table.name().to_string(),
                column: fk.column.clone(),
            });
        }
        if !known_tables.contains(&fk.referenced_table.to_lowercase()) {
            return Err(ValidationError::UnknownReferencedTable {
                table: table.name().to_string(),
                column: fk.column.clone(),
                referenced_table: fk.referenced_table.clone(),
            });
        }
    }

    for index in &table.indexes_to_add {
        if let Some(missing) = index.columns.iter().find(|c| !columns.contains(c.as_str())) {
            return Err(ValidationError::UnknownIndexColumn {
                table: table.name().to_string(),
                index: index.name.clone(),
                column: missing.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::SchemaDiffer;
    use strata_schema::{Column, ForeignKey, Index, Schema, Table};

    fn create(table: Table) -> TableDiff {
        TableDiff {
            columns_to_add: table.columns.clone(),
            indexes_to_add: table.indexes.clone(),
            foreign_keys_to_add: table.foreign_keys.clone(),
            ..TableDiff::new(table)
        }
    }

    fn diff_of(tables: Vec<Table>) -> SchemaDiff {
        SchemaDiff {
            tables_to_create: tables.into_iter().map(create).collect(),
            ..Default::default()
        }
    }

    fn users() -> Table {
        Table::new("users").column(Column::new("id", "int").primary_key())
    }

    #[test]
    fn test_valid_diff() {
        let orders = Table::new("orders")
            .column(Column::new("id", "int").primary_key())
            .column(Column::new("user_id", "int"))
            .column(Column::new("total", "decimal(10,2)"))
            .index(Index::new("idx_orders_user_id", ["user_id"]))
            .foreign_key(ForeignKey::new("user_id", "users"));
        assert_eq!(validate(&diff_of(vec![users(), orders])), Ok(()));
    }

    #[test]
    fn test_no_changes() {
        let err = validate(&SchemaDiff::default()).unwrap_err();
        assert_eq!(err, ValidationError::NoChanges);
        assert_eq!(err.to_string(), "no schema changes detected");
    }

    #[test]
    fn test_empty_modify_diffs_count_as_no_changes() {
        let diff = SchemaDiff {
            tables_to_modify: vec![TableDiff::new(users())],
            ..Default::default()
        };
        assert_eq!(validate(&diff), Err(ValidationError::NoChanges));
    }

    #[test]
    fn test_empty_table_name() {
        let diff = diff_of(vec![Table::new("").column(Column::new("id", "int"))]);
        assert_eq!(validate(&diff), Err(ValidationError::EmptyTableName));
    }

    #[test]
    fn test_duplicate_column_is_case_sensitive() {
        let mut table = create(users());
        table.columns_to_add.push(Column::new("id", "int"));
        let diff = SchemaDiff {
            tables_to_create: vec![table],
            ..Default::default()
        };
        assert_eq!(validate(&diff).unwrap_err().code(), "duplicate_column");

        let mut table = create(users());
        table.columns_to_add.push(Column::new("ID", "int"));
        let diff = SchemaDiff {
            tables_to_create: vec![table],
            ..Default::default()
        };
        assert_eq!(validate(&diff), Ok(()));
    }

    #[test]
    fn test_unsupported_type() {
        let diff = diff_of(vec![users().column(Column::new("blob", "not_a_real_type"))]);
        let err = validate(&diff).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unsupported column type not_a_real_type for column blob in table users"
        );
    }

    #[test]
    fn test_foreign_key_column_missing() {
        let orders = Table::new("orders")
            .column(Column::new("id", "int").primary_key())
            .foreign_key(ForeignKey::new("user_id", "users"));
        let err = validate(&diff_of(vec![users(), orders])).unwrap_err();
        assert_eq!(err.code(), "unknown_foreign_key_column");
    }

    #[test]
    fn test_referenced_table_missing() {
        let orders = Table::new("orders")
            .column(Column::new("user_id", "int"))
            .foreign_key(ForeignKey::new("user_id", "users"));
        let diff = diff_of(vec![orders]);
        assert!(matches!(
            validate(&diff),
            Err(ValidationError::UnknownReferencedTable { .. })
        ));

        let validator = Validator::new().with_existing_tables(["Users"]);
        assert_eq!(validator.validate(&diff), Ok(()));
    }

    #[test]
    fn test_modified_tables_are_not_reference_targets() {
        let current = Schema::from_tables([
            Table::new("accounts").column(Column::new("id", "int").primary_key()),
            Table::new("orders").column(Column::new("id", "int").primary_key()),
        ])
        .unwrap();
        let target = Schema::from_tables([
            Table::new("users")
                .column(Column::new("id", "int").primary_key())
                .column(Column::new("nickname", "text")),
            Table::new("orders")
                .column(Column::new("id", "int").primary_key())
                .column(Column::new("user_id", "int"))
                .foreign_key(ForeignKey::new("user_id", "users")),
        ])
        .unwrap();
        let diff = SchemaDiffer::new(target)
            .with_current(current.clone())
            .rename_table("accounts", "users")
            .diff()
            .unwrap();

        assert_eq!(validate(&diff).unwrap_err().code(), "unknown_referenced_table");

        let validator = Validator::new().with_existing_tables(current.table_names());
        assert_eq!(validator.validate(&diff), Ok(()));
    }

    #[test]
    fn test_index_column_missing() {
        let table = users().index(Index::new("idx_users_email", ["email"]));
        let err = validate(&diff_of(vec![table])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "index idx_users_email references non-existent column email in table users"
        );
    }

    #[test]
    fn test_modified_table_checks_target_columns() {
        let current = Schema::from_tables([
            users(),
            Table::new("orders")
                .column(Column::new("id", "int").primary_key())
                .column(Column::new("user_id", "int")),
        ])
        .unwrap();
        let target = Schema::from_tables([
            users(),
            Table::new("orders")
                .column(Column::new("id", "int").primary_key())
                .column(Column::new("user_id", "int"))
                .foreign_key(ForeignKey::new("user_id", "users")),
        ])
        .unwrap();

        let validator = Validator::new().with_existing_tables(current.table_names());
        let diff = SchemaDiffer::new(target).with_current(current).diff().unwrap();
        assert_eq!(validator.validate(&diff), Ok(()));
    }
}
