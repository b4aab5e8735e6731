//! Schema diffing for generating migrations.
//!
//! [`SchemaDiffer`] compares the current schema (introspected from a live
//! database) with the target schema (declared by the application) and
//! produces a [`SchemaDiff`]. New tables go through the same per-table path
//! as existing ones, diffed against an empty table, so their columns, indexes
//! and foreign keys all land in the `*_to_add` lists.

use std::collections::HashMap;

use strata_schema::{AUTO_INCREMENT_DEFAULT, Column, ForeignKey, Index, Schema, Table};
use strata_schema::{normalize_default, normalize_type};
use tracing::debug;

use crate::error::{MigrateResult, MigrationError};

/// A diff between two schemas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDiff {
    /// Tables to create. Every column, index and foreign key is in the add lists.
    pub tables_to_create: Vec<TableDiff>,
    /// Tables to drop, by their name in the current schema.
    pub tables_to_drop: Vec<String>,
    /// Existing tables with at least one change.
    pub tables_to_modify: Vec<TableDiff>,
    /// Explicit table renames.
    pub tables_to_rename: Vec<Rename>,
}

impl SchemaDiff {
    /// Check if there are any differences.
    pub fn is_empty(&self) -> bool {
        self.tables_to_create.is_empty()
            && self.tables_to_drop.is_empty()
            && self.tables_to_rename.is_empty()
            && self.tables_to_modify.iter().all(TableDiff::is_empty)
    }

    /// Inverse of [`is_empty`](Self::is_empty).
    pub fn has_changes(&self) -> bool {
        !self.is_empty()
    }

    /// Whether applying the diff discards data.
    pub fn is_destructive(&self) -> bool {
        !self.tables_to_drop.is_empty()
            || self
                .tables_to_modify
                .iter()
                .any(|t| !t.columns_to_drop.is_empty())
    }

    /// Get a human-readable summary of the diff.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        if !self.tables_to_create.is_empty() {
            parts.push(format!("Create {} tables", self.tables_to_create.len()));
        }
        if !self.tables_to_rename.is_empty() {
            parts.push(format!("Rename {} tables", self.tables_to_rename.len()));
        }
        if !self.tables_to_modify.is_empty() {
            parts.push(format!("Alter {} tables", self.tables_to_modify.len()));
        }
        if !self.tables_to_drop.is_empty() {
            parts.push(format!("Drop {} tables", self.tables_to_drop.len()));
        }

        if parts.is_empty() {
            "No changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Changes to a single table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableDiff {
    /// The target definition of the table.
    pub table: Table,
    pub columns_to_add: Vec<Column>,
    /// Dropped columns keep their full definition so they can be restored.
    pub columns_to_drop: Vec<Column>,
    pub columns_to_modify: Vec<ColumnChange>,
    pub columns_to_rename: Vec<Rename>,
    pub indexes_to_add: Vec<Index>,
    pub indexes_to_drop: Vec<Index>,
    pub indexes_to_modify: Vec<Change<Index>>,
    pub foreign_keys_to_add: Vec<ForeignKey>,
    pub foreign_keys_to_drop: Vec<ForeignKey>,
    pub foreign_keys_to_modify: Vec<Change<ForeignKey>>,
}

impl TableDiff {
    /// An empty diff for a table.
    pub fn new(table: Table) -> Self {
        Self {
            table,
            ..Default::default()
        }
    }

    /// Name of the table in the target schema.
    pub fn name(&self) -> &str {
        &self.table.name
    }

    /// Whether every operation list is empty.
    pub fn is_empty(&self) -> bool {
        self.columns_to_add.is_empty()
            && self.columns_to_drop.is_empty()
            && self.columns_to_modify.is_empty()
            && self.columns_to_rename.is_empty()
            && self.indexes_to_add.is_empty()
            && self.indexes_to_drop.is_empty()
            && self.indexes_to_modify.is_empty()
            && self.foreign_keys_to_add.is_empty()
            && self.foreign_keys_to_drop.is_empty()
            && self.foreign_keys_to_modify.is_empty()
    }
}

/// A value that exists on both sides but differs.
#[derive(Debug, Clone, PartialEq)]
pub struct Change<T> {
    pub from: T,
    pub to: T,
}

/// A modified column.
pub type ColumnChange = Change<Column>;

impl Change<Column> {
    pub fn type_changed(&self) -> bool {
        normalize_type(&self.from.data_type) != normalize_type(&self.to.data_type)
    }

    pub fn nullable_changed(&self) -> bool {
        !self.to.primary_key && self.from.nullable != self.to.nullable
    }

    pub fn default_changed(&self) -> bool {
        effective_default(&self.from) != effective_default(&self.to)
    }

    pub fn unique_changed(&self) -> bool {
        self.from.unique != self.to.unique
    }

    /// Primary key or auto-increment changed. These need manual SQL.
    pub fn key_changed(&self) -> bool {
        self.from.primary_key != self.to.primary_key
            || is_auto_increment(&self.from) != is_auto_increment(&self.to)
    }
}

/// An explicit rename pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub from: String,
    pub to: String,
}

impl Rename {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Column rename scoped to a table.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ColumnRename {
    table: String,
    rename: Rename,
}

/// Schema differ for comparing schemas.
#[derive(Debug, Clone)]
pub struct SchemaDiffer {
    /// Current database state.
    current: Schema,
    /// Desired state.
    target: Schema,
    /// Whether columns missing from the target are dropped from existing tables.
    drop_columns: bool,
    table_renames: Vec<Rename>,
    column_renames: Vec<ColumnRename>,
}

impl SchemaDiffer {
    /// Create a new differ against an empty current schema.
    pub fn new(target: Schema) -> Self {
        Self {
            current: Schema::new(),
            target,
            drop_columns: true,
            table_renames: Vec::new(),
            column_renames: Vec::new(),
        }
    }

    /// Set the current schema.
    pub fn with_current(mut self, current: Schema) -> Self {
        self.current = current;
        self
    }

    /// Column removal policy for existing tables. Defaults to `true`.
    pub fn drop_columns(mut self, enabled: bool) -> Self {
        self.drop_columns = enabled;
        self
    }

    /// Declare that current table `from` is target table `to`.
    pub fn rename_table(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.table_renames.push(Rename::new(from, to));
        self
    }

    /// Declare that column `from` of target table `table` is now called `to`.
    pub fn rename_column(
        mut self,
        table: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        self.column_renames.push(ColumnRename {
            table: table.into(),
            rename: Rename::new(from, to),
        });
        self
    }

    /// Compute the diff between schemas.
    pub fn diff(&self) -> MigrateResult<SchemaDiff> {
        let mut result = SchemaDiff::default();

        // Current tables by lower-cased name; renamed tables are keyed by their new name.
        let mut current: HashMap<String, &Table> = self
            .current
            .tables()
            .map(|t| (t.name.to_lowercase(), t))
            .collect();

        for rename in &self.table_renames {
            let table = current.remove(&rename.from.to_lowercase()).ok_or_else(|| {
                MigrationError::InvalidRename(format!(
                    "table '{}' does not exist in the current schema",
                    rename.from
                ))
            })?;
            if !self.target.contains(&rename.to) {
                return Err(MigrationError::InvalidRename(format!(
                    "table '{}' does not exist in the target schema",
                    rename.to
                )));
            }
            if current.contains_key(&rename.to.to_lowercase()) {
                return Err(MigrationError::InvalidRename(format!(
                    "table '{}' already exists in the current schema",
                    rename.to
                )));
            }
            current.insert(rename.to.to_lowercase(), table);
            result.tables_to_rename.push(rename.clone());
        }

        for target in self.target.tables() {
            match current.get(&target.name.to_lowercase()) {
                None => {
                    debug!(table = %target.name, "Table will be created");
                    result
                        .tables_to_create
                        .push(self.diff_table(&Table::empty(), target)?);
                }
                Some(existing) => {
                    let table_diff = self.diff_table(existing, target)?;
                    if !table_diff.is_empty() {
                        debug!(table = %target.name, "Table will be altered");
                        result.tables_to_modify.push(table_diff);
                    }
                }
            }
        }

        let renamed: Vec<String> = self
            .table_renames
            .iter()
            .map(|r| r.from.to_lowercase())
            .collect();
        for existing in self.current.tables() {
            let key = existing.name.to_lowercase();
            if !self.target.contains(&key) && !renamed.contains(&key) {
                debug!(table = %existing.name, "Table will be dropped");
                result.tables_to_drop.push(existing.name.clone());
            }
        }

        Ok(result)
    }

    /// Diff one table. Pass [`Table::empty`] as `current` for a new table.
    pub fn diff_table(&self, current: &Table, target: &Table) -> MigrateResult<TableDiff> {
        let mut diff = TableDiff::new(target.clone());
        let is_new = current.is_empty();

        // Target column name -> current column, honoring explicit renames.
        let mut current_columns: HashMap<String, &Column> = current
            .columns
            .iter()
            .map(|c| (c.name.to_lowercase(), c))
            .collect();
        let mut renamed_from = Vec::new();

        for cr in self
            .column_renames
            .iter()
            .filter(|cr| cr.table.eq_ignore_ascii_case(&target.name))
        {
            if is_new {
                continue;
            }
            let column = current_columns
                .remove(&cr.rename.from.to_lowercase())
                .ok_or_else(|| {
                    MigrationError::InvalidRename(format!(
                        "column '{}.{}' does not exist in the current schema",
                        target.name, cr.rename.from
                    ))
                })?;
            if target.get_column(&cr.rename.to).is_none() {
                return Err(MigrationError::InvalidRename(format!(
                    "column '{}.{}' does not exist in the target schema",
                    target.name, cr.rename.to
                )));
            }
            if current_columns.contains_key(&cr.rename.to.to_lowercase()) {
                return Err(MigrationError::InvalidRename(format!(
                    "column '{}.{}' already exists in the current schema",
                    target.name, cr.rename.to
                )));
            }
            current_columns.insert(cr.rename.to.to_lowercase(), column);
            renamed_from.push(cr.rename.from.to_lowercase());
            diff.columns_to_rename.push(cr.rename.clone());
        }

        for column in &target.columns {
            match current_columns.get(&column.name.to_lowercase()) {
                None => diff.columns_to_add.push(column.clone()),
                Some(existing) => {
                    let from = with_index_uniqueness(current, existing);
                    let to = with_index_uniqueness(target, column);
                    if !columns_equal(&from, &to) {
                        diff.columns_to_modify.push(Change { from, to });
                    }
                }
            }
        }

        if self.drop_columns || is_new {
            for column in &current.columns {
                let key = column.name.to_lowercase();
                if target.get_column(&key).is_none() && !renamed_from.contains(&key) {
                    diff.columns_to_drop.push(column.clone());
                }
            }
        }

        // Live catalogs rarely report indexes faithfully; only new tables get index diffs.
        if is_new {
            diff_indexes(current, target, &mut diff);
        }

        for fk in &target.foreign_keys {
            if !current.foreign_keys.iter().any(|existing| existing.same_target(fk)) {
                diff.foreign_keys_to_add.push(fk.clone());
            }
        }

        Ok(diff)
    }
}

/// Diff two schemas with the default policy.
pub fn diff_schemas(current: &Schema, target: &Schema) -> MigrateResult<SchemaDiff> {
    SchemaDiffer::new(target.clone())
        .with_current(current.clone())
        .diff()
}

fn diff_indexes(current: &Table, target: &Table, diff: &mut TableDiff) {
    for index in &target.indexes {
        match current.get_index(&index.name) {
            None => diff.indexes_to_add.push(index.clone()),
            Some(existing) if existing != index => diff.indexes_to_modify.push(Change {
                from: existing.clone(),
                to: index.clone(),
            }),
            Some(_) => {}
        }
    }
    for index in &current.indexes {
        if target.get_index(&index.name).is_none() {
            diff.indexes_to_drop.push(index.clone());
        }
    }
}

/// Whether two matched columns are equivalent after normalization.
///
/// Columns are matched by name (or an explicit rename) before this is called.
pub fn columns_equal(current: &Column, target: &Column) -> bool {
    let change = Change {
        from: current.clone(),
        to: target.clone(),
    };
    !(change.type_changed()
        || change.key_changed()
        || change.unique_changed()
        || change.default_changed()
        || (!current.primary_key && !target.primary_key && current.nullable != target.nullable))
}

/// A single-column unique index makes its column unique.
fn with_index_uniqueness(table: &Table, column: &Column) -> Column {
    let mut column = column.clone();
    column.unique = column.unique
        || (!column.primary_key
            && table.indexes.iter().any(|index| {
                index.unique
                    && index.columns.len() == 1
                    && index.columns[0].eq_ignore_ascii_case(&column.name)
            }));
    column
}

/// A sequence default counts as the auto-increment flag.
fn is_auto_increment(column: &Column) -> bool {
    column.auto_increment || normalize_default(&column.default) == AUTO_INCREMENT_DEFAULT
}

fn effective_default(column: &Column) -> String {
    let normalized = normalize_default(&column.default);
    if normalized == AUTO_INCREMENT_DEFAULT {
        String::new()
    } else {
        normalized
    }
}
