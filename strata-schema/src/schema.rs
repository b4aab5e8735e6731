//! Canonical schema model.
//!
//! A [`Schema`] is a case-insensitive map of table name to [`Table`]. Tables,
//! columns, indexes and foreign keys are plain values: once built they are
//! never edited in place, and a diff always produces new values.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::document::SchemaDocument;
use crate::error::{SchemaError, SchemaResult};
use crate::types::{LogicalType, normalize_type};

/// A complete canonical schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SchemaDocument", into = "SchemaDocument")]
pub struct Schema {
    /// Tables keyed by lower-cased name, in insertion order.
    tables: IndexMap<SmolStr, Table>,
}

impl Schema {
    /// Create a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schema from a list of tables.
    pub fn from_tables(tables: impl IntoIterator<Item = Table>) -> SchemaResult<Self> {
        let mut schema = Self::new();
        for table in tables {
            schema.add_table(table)?;
        }
        Ok(schema)
    }

    /// Add a table, rejecting names that collide case-insensitively.
    pub fn add_table(&mut self, table: Table) -> SchemaResult<()> {
        table.validate()?;
        let key = table.key();
        if self.tables.contains_key(&key) {
            return Err(SchemaError::duplicate_table(&table.name));
        }
        self.tables.insert(key, table);
        Ok(())
    }

    /// Get a table by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name.to_lowercase().as_str())
    }

    /// Check if a table exists, ignoring case.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate over tables in insertion order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    /// Table names as declared.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.values().map(|t| t.name.as_str())
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether the schema has no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Consume the schema, yielding its tables in insertion order.
    pub fn into_tables(self) -> Vec<Table> {
        self.tables.into_values().collect()
    }
}

/// Schema statistics for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaStats {
    pub table_count: usize,
    pub column_count: usize,
    pub index_count: usize,
    pub foreign_key_count: usize,
}

impl Schema {
    /// Get statistics about the schema.
    pub fn stats(&self) -> SchemaStats {
        SchemaStats {
            table_count: self.tables.len(),
            column_count: self.tables().map(|t| t.columns.len()).sum(),
            index_count: self.tables().map(|t| t.indexes.len()).sum(),
            foreign_key_count: self.tables().map(|t| t.foreign_keys.len()).sum(),
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        write!(
            f,
            "Schema({} tables, {} columns, {} indexes, {} foreign keys)",
            stats.table_count, stats.column_count, stats.index_count, stats.foreign_key_count
        )
    }
}

/// A database table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Table name as declared.
    pub name: String,
    /// Columns in declaration order.
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<Index>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    /// Create a new table without columns.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// An unnamed table with nothing in it, the baseline for new tables.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add a column.
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Add an index.
    pub fn index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Add a foreign key.
    pub fn foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Lower-cased lookup key.
    pub fn key(&self) -> SmolStr {
        SmolStr::new(self.name.to_lowercase())
    }

    /// Get a column by name, ignoring case.
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Get an index by name.
    pub fn get_index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// The primary key column, if any.
    pub fn primary_key(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.primary_key)
    }

    /// Whether the table has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Names of other tables this table references.
    pub fn referenced_tables(&self) -> impl Iterator<Item = &str> {
        self.foreign_keys
            .iter()
            .map(|fk| fk.referenced_table.as_str())
            .filter(|t| !t.eq_ignore_ascii_case(&self.name))
    }

    /// Check column name uniqueness and the single primary key rule.
    pub fn validate(&self) -> SchemaResult<()> {
        let mut seen = std::collections::HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.to_lowercase()) {
                return Err(SchemaError::duplicate_column(&self.name, &column.name));
            }
        }

        let pks: Vec<&str> = self
            .columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect();
        if pks.len() > 1 {
            return Err(SchemaError::MultiplePrimaryKeys {
                table: self.name.clone(),
                columns: pks.join(", "),
            });
        }
        Ok(())
    }
}

/// A table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// Raw type spelling. Compared through [`normalize_type`].
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub primary_key: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub auto_increment: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique: bool,
    /// Raw default expression, empty when there is none.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
}

fn default_nullable() -> bool {
    true
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Column {
    /// Create a nullable column of the given type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            primary_key: false,
            auto_increment: false,
            unique: false,
            default: String::new(),
            size: None,
            precision: None,
            scale: None,
        }
    }

    /// Mark as primary key. Primary keys are never nullable.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Set the raw default expression.
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = value.into();
        self
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    /// Normalized logical type.
    pub fn logical_type(&self) -> LogicalType {
        normalize_type(&self.data_type)
    }
}

/// A table index. The name identifies it within its table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique: bool,
}

impl Index {
    pub fn new<S: Into<String>>(name: impl Into<String>, columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// What happens to referencing rows when the referenced row is deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    #[default]
    Cascade,
    Restrict,
    #[serde(alias = "set null")]
    SetNull,
    #[serde(alias = "set default")]
    SetDefault,
    #[serde(alias = "no action")]
    NoAction,
}

impl ReferentialAction {
    /// SQL keyword form.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::Restrict => "RESTRICT",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
            Self::NoAction => "NO ACTION",
        }
    }

    /// Parse a catalog `delete_rule` value such as `SET NULL`.
    pub fn from_rule(rule: &str) -> Option<Self> {
        match rule.trim().to_uppercase().as_str() {
            "CASCADE" => Some(Self::Cascade),
            "RESTRICT" => Some(Self::Restrict),
            "SET NULL" => Some(Self::SetNull),
            "SET DEFAULT" => Some(Self::SetDefault),
            "NO ACTION" => Some(Self::NoAction),
            _ => None,
        }
    }
}

/// A single-column foreign key owned by a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Explicit constraint name. Generated from table and column when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Owning column.
    pub column: String,
    pub referenced_table: String,
    /// Referenced column. Defaults to the referenced table's primary key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_column: Option<String>,
    #[serde(default)]
    pub on_delete: ReferentialAction,
}

impl ForeignKey {
    pub fn new(column: impl Into<String>, referenced_table: impl Into<String>) -> Self {
        Self {
            name: None,
            column: column.into(),
            referenced_table: referenced_table.into(),
            referenced_column: None,
            on_delete: ReferentialAction::Cascade,
        }
    }

    pub fn references_column(mut self, column: impl Into<String>) -> Self {
        self.referenced_column = Some(column.into());
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = action;
        self
    }

    /// Constraint name: the explicit one, else `fk_{table}_{column}_fkey`.
    pub fn constraint_name(&self, table: &str) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("fk_{}_{}_fkey", table, self.column))
    }

    /// Whether two foreign keys have the same identity: owning column and
    /// referenced table, ignoring case.
    pub fn same_target(&self, other: &ForeignKey) -> bool {
        self.column.eq_ignore_ascii_case(&other.column)
            && self.referenced_table.eq_ignore_ascii_case(&other.referenced_table)
    }
}
