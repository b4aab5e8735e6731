//! SQL generation for migrations.
//!
//! Up SQL runs, in order: table renames, table creation (parents first),
//! per-table alterations, table drops. Down SQL is derived from the same
//! diff and the same creation order, undoing the steps in reverse.

use std::collections::HashMap;

use strata_schema::{AUTO_INCREMENT_DEFAULT, Column, ForeignKey, Index, normalize_default};
use tracing::{debug, warn};

use crate::diff::{ColumnChange, SchemaDiff, TableDiff};
use crate::dialect::{Dialect, Postgres};
use crate::error::MigrateResult;
use crate::resolve::{reverse_order, topo_sort};

/// Marker for statements that need a human.
pub const MANUAL_INTERVENTION: &str = "-- MANUAL INTERVENTION REQUIRED:";

/// Generated SQL for a migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationSql {
    /// SQL to apply the migration.
    pub up: String,
    /// SQL to rollback the migration.
    pub down: String,
}

impl MigrationSql {
    /// Check if the migration is empty.
    pub fn is_empty(&self) -> bool {
        self.up.trim().is_empty()
    }

    /// Whether the down SQL contains placeholders that must be edited by hand.
    pub fn needs_manual_rollback(&self) -> bool {
        self.down.contains(MANUAL_INTERVENTION)
    }
}

/// Renders a [`SchemaDiff`] as DDL for one dialect.
#[derive(Clone, Copy)]
pub struct SqlGenerator<'d> {
    dialect: &'d dyn Dialect,
}

impl Default for SqlGenerator<'static> {
    fn default() -> Self {
        Self::postgres()
    }
}

impl SqlGenerator<'static> {
    /// Generator for PostgreSQL.
    pub fn postgres() -> Self {
        Self { dialect: &Postgres }
    }
}

impl<'d> SqlGenerator<'d> {
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self { dialect }
    }

    /// The dialect in use.
    pub fn dialect(&self) -> &'d dyn Dialect {
        self.dialect
    }

    /// Generate both directions, ordering the created tables once.
    pub fn generate(&self, diff: &SchemaDiff) -> MigrateResult<MigrationSql> {
        let order = topo_sort(&diff.tables_to_create)?;
        Ok(MigrationSql {
            up: join(self.up_statements(diff, &order)),
            down: join(self.down_statements(diff, &order)),
        })
    }

    /// Forward SQL. Fails when the created tables reference each other in a cycle.
    pub fn generate_up(&self, diff: &SchemaDiff) -> MigrateResult<String> {
        let order = topo_sort(&diff.tables_to_create)?;
        Ok(join(self.up_statements(diff, &order)))
    }

    /// Reverse SQL. Falls back to reverse declaration order when no
    /// dependency order exists.
    pub fn generate_down(&self, diff: &SchemaDiff) -> String {
        let order = match topo_sort(&diff.tables_to_create) {
            Ok(order) => order,
            Err(e) => {
                warn!(error = %e, "Using declaration order for down migration");
                diff.tables_to_create.clone()
            }
        };
        join(self.down_statements(diff, &order))
    }

    fn up_statements(&self, diff: &SchemaDiff, order: &[TableDiff]) -> Vec<String> {
        let keys = PrimaryKeys::from_diff(diff);
        let mut stmts = Vec::new();

        for rename in &diff.tables_to_rename {
            stmts.push(self.rename_table(&rename.from, &rename.to));
        }

        for table in order {
            debug!(table = %table.name(), "Generating CREATE TABLE");
            stmts.push(self.create_table(table, &keys));
            for index in table.indexes_to_add.iter().filter(|i| !i.unique) {
                stmts.push(self.create_index(table.name(), index));
            }
        }

        for table in &diff.tables_to_modify {
            stmts.extend(self.alter_table(table, &keys));
        }

        for name in &diff.tables_to_drop {
            stmts.push(self.drop_table(name, self.dialect.supports_drop_cascade()));
        }

        stmts
    }

    fn down_statements(&self, diff: &SchemaDiff, order: &[TableDiff]) -> Vec<String> {
        let mut stmts = Vec::new();

        for name in diff.tables_to_drop.iter().rev() {
            stmts.push(format!(
                "{} recreate dropped table {}",
                MANUAL_INTERVENTION,
                self.dialect.quote_ident(name)
            ));
        }

        for table in diff.tables_to_modify.iter().rev() {
            stmts.extend(self.revert_table(table));
        }

        let drop_order = reverse_order(order);
        for table in &drop_order {
            for index in table.indexes_to_add.iter().filter(|i| !i.unique) {
                stmts.push(self.drop_index(&index.name));
            }
            if self.dialect.supports_alter_constraints() {
                for fk in &table.foreign_keys_to_add {
                    stmts.push(self.drop_foreign_key(table.name(), fk));
                }
            }
        }
        for table in &drop_order {
            stmts.push(self.drop_table(table.name(), false));
        }

        for rename in diff.tables_to_rename.iter().rev() {
            stmts.push(self.rename_table(&rename.to, &rename.from));
        }

        stmts
    }

    /// Generate CREATE TABLE statement.
    fn create_table(&self, table: &TableDiff, keys: &PrimaryKeys) -> String {
        let mut lines: Vec<String> = table
            .columns_to_add
            .iter()
            .map(|c| self.column_definition(c))
            .collect();

        for fk in &table.foreign_keys_to_add {
            lines.push(self.foreign_key_clause(table.name(), fk, keys));
        }

        for index in table.indexes_to_add.iter().filter(|i| i.unique) {
            lines.push(format!(
                "CONSTRAINT {} UNIQUE ({})",
                self.dialect.quote_if_needed(&index.name),
                self.column_list(&index.columns)
            ));
        }

        format!(
            "CREATE TABLE {} (\n    {}\n);",
            self.dialect.quote_ident(table.name()),
            lines.join(",\n    ")
        )
    }

    /// Generate column definition.
    fn column_definition(&self, column: &Column) -> String {
        let mut parts = vec![
            self.dialect.quote_ident(&column.name),
            self.dialect.column_type(column),
        ];

        if !column.nullable || column.primary_key {
            parts.push("NOT NULL".to_string());
        }

        if column.primary_key {
            parts.push(self.dialect.primary_key_clause(column));
        } else if column.unique {
            parts.push("UNIQUE".to_string());
        }

        if let Some(default) = self.default_expression(column) {
            parts.push(format!("DEFAULT {default}"));
        }

        parts.join(" ")
    }

    /// Raw default to render, if any. Sequence defaults become the serial type instead.
    fn default_expression<'c>(&self, column: &'c Column) -> Option<&'c str> {
        let raw = column.default.trim();
        if raw.is_empty()
            || column.primary_key
            || normalize_default(raw) == AUTO_INCREMENT_DEFAULT
        {
            None
        } else {
            Some(raw)
        }
    }

    fn foreign_key_clause(&self, table: &str, fk: &ForeignKey, keys: &PrimaryKeys) -> String {
        format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({}) ON DELETE {}",
            self.dialect.quote_if_needed(&fk.constraint_name(table)),
            self.dialect.quote_ident(&fk.column),
            self.dialect.quote_ident(&fk.referenced_table),
            self.dialect.quote_if_needed(&keys.referenced_column(fk)),
            fk.on_delete.as_sql()
        )
    }

    /// Generate ALTER TABLE statements.
    fn alter_table(&self, table: &TableDiff, keys: &PrimaryKeys) -> Vec<String> {
        let name = self.dialect.quote_ident(table.name());
        let mut stmts = Vec::new();

        for rename in &table.columns_to_rename {
            stmts.push(format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {};",
                name,
                self.dialect.quote_ident(&rename.from),
                self.dialect.quote_ident(&rename.to)
            ));
        }

        for column in &table.columns_to_add {
            stmts.push(format!(
                "ALTER TABLE {} ADD COLUMN {};",
                name,
                self.column_definition(column)
            ));
        }

        for column in &table.columns_to_drop {
            stmts.push(format!(
                "ALTER TABLE {} DROP COLUMN {};",
                name,
                self.dialect.quote_ident(&column.name)
            ));
        }

        for change in &table.columns_to_modify {
            stmts.extend(self.alter_column(table.name(), change));
        }

        for fk in &table.foreign_keys_to_add {
            if self.dialect.supports_alter_constraints() {
                stmts.push(format!(
                    "ALTER TABLE {} ADD {};",
                    name,
                    self.foreign_key_clause(table.name(), fk, keys)
                ));
            } else {
                stmts.push(format!(
                    "{} add foreign key {} on {}.{} (requires rebuilding the table)",
                    MANUAL_INTERVENTION,
                    fk.constraint_name(table.name()),
                    name,
                    self.dialect.quote_ident(&fk.column)
                ));
            }
        }

        for index in &table.indexes_to_drop {
            stmts.push(self.drop_index(&index.name));
        }
        for change in &table.indexes_to_modify {
            stmts.push(self.drop_index(&change.from.name));
            stmts.push(self.create_index(table.name(), &change.to));
        }
        for index in &table.indexes_to_add {
            stmts.push(self.create_index(table.name(), index));
        }

        stmts
    }

    /// Generate ALTER COLUMN statements.
    fn alter_column(&self, table: &str, change: &ColumnChange) -> Vec<String> {
        let table_ident = self.dialect.quote_ident(table);
        let column = self.dialect.quote_ident(&change.to.name);
        let mut stmts = Vec::new();

        if change.key_changed() {
            stmts.push(format!(
                "{} primary key or auto-increment change on {}.{}",
                MANUAL_INTERVENTION, table_ident, column
            ));
        }

        if !self.dialect.supports_alter_column() {
            if change.type_changed() || change.nullable_changed() || change.default_changed() {
                stmts.push(format!(
                    "{} alter column {}.{} to {} (requires rebuilding the table)",
                    MANUAL_INTERVENTION,
                    table_ident,
                    column,
                    self.column_definition(&change.to)
                ));
            }
            return stmts;
        }

        if change.type_changed() {
            let new_type = self.dialect.storage_type(&change.to);
            stmts.push(format!(
                "ALTER TABLE {table_ident} ALTER COLUMN {column} TYPE {new_type} USING {column}::{new_type};"
            ));
        }

        if change.nullable_changed() {
            let action = if change.to.nullable {
                "DROP NOT NULL"
            } else {
                "SET NOT NULL"
            };
            stmts.push(format!(
                "ALTER TABLE {table_ident} ALTER COLUMN {column} {action};"
            ));
        }

        if change.default_changed() {
            match self.default_expression(&change.to) {
                Some(default) => stmts.push(format!(
                    "ALTER TABLE {table_ident} ALTER COLUMN {column} SET DEFAULT {default};"
                )),
                None => stmts.push(format!(
                    "ALTER TABLE {table_ident} ALTER COLUMN {column} DROP DEFAULT;"
                )),
            }
        }

        if change.unique_changed() && !change.to.primary_key {
            let constraint = self
                .dialect
                .quote_if_needed(&format!("{}_{}_key", table, change.to.name));
            if change.to.unique {
                stmts.push(format!(
                    "ALTER TABLE {table_ident} ADD CONSTRAINT {constraint} UNIQUE ({column});"
                ));
            } else {
                stmts.push(format!(
                    "ALTER TABLE {table_ident} DROP CONSTRAINT IF EXISTS {constraint};"
                ));
            }
        }

        stmts
    }

    /// Statements undoing one table's alterations, newest first.
    fn revert_table(&self, table: &TableDiff) -> Vec<String> {
        let name = self.dialect.quote_ident(table.name());
        let mut stmts = Vec::new();

        for index in table.indexes_to_add.iter().rev() {
            stmts.push(self.drop_index(&index.name));
        }
        for change in table.indexes_to_modify.iter().rev() {
            stmts.push(self.drop_index(&change.to.name));
            stmts.push(self.create_index(table.name(), &change.from));
        }
        for index in table.indexes_to_drop.iter().rev() {
            stmts.push(self.create_index(table.name(), index));
        }

        if self.dialect.supports_alter_constraints() {
            for fk in table.foreign_keys_to_add.iter().rev() {
                stmts.push(self.drop_foreign_key(table.name(), fk));
            }
        }

        for column in table.columns_to_add.iter().rev() {
            stmts.push(format!(
                "ALTER TABLE {} DROP COLUMN {};",
                name,
                self.dialect.quote_ident(&column.name)
            ));
        }

        for column in table.columns_to_drop.iter().rev() {
            stmts.push(format!(
                "ALTER TABLE {} ADD COLUMN {};",
                name,
                self.column_definition(column)
            ));
        }

        for change in table.columns_to_modify.iter().rev() {
            stmts.push(format!(
                "{} revert column {}.{} to {}",
                MANUAL_INTERVENTION,
                name,
                self.dialect.quote_ident(&change.to.name),
                self.column_definition(&change.from)
            ));
        }

        for rename in table.columns_to_rename.iter().rev() {
            stmts.push(format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {};",
                name,
                self.dialect.quote_ident(&rename.to),
                self.dialect.quote_ident(&rename.from)
            ));
        }

        stmts
    }

    /// Generate CREATE INDEX statement.
    fn create_index(&self, table: &str, index: &Index) -> String {
        let unique = if index.unique { "UNIQUE " } else { "" };
        format!(
            "CREATE {}INDEX {} ON {} ({});",
            unique,
            self.dialect.quote_if_needed(&index.name),
            self.dialect.quote_ident(table),
            self.column_list(&index.columns)
        )
    }

    /// Generate DROP INDEX statement.
    fn drop_index(&self, name: &str) -> String {
        format!("DROP INDEX IF EXISTS {};", self.dialect.quote_if_needed(name))
    }

    fn drop_foreign_key(&self, table: &str, fk: &ForeignKey) -> String {
        format!(
            "ALTER TABLE {} DROP CONSTRAINT IF EXISTS {};",
            self.dialect.quote_ident(table),
            self.dialect.quote_if_needed(&fk.constraint_name(table))
        )
    }

    /// Generate DROP TABLE statement.
    fn drop_table(&self, name: &str, cascade: bool) -> String {
        let suffix = if cascade { " CASCADE" } else { "" };
        format!(
            "DROP TABLE IF EXISTS {}{};",
            self.dialect.quote_ident(name),
            suffix
        )
    }

    fn rename_table(&self, from: &str, to: &str) -> String {
        format!(
            "ALTER TABLE {} RENAME TO {};",
            self.dialect.quote_ident(from),
            self.dialect.quote_ident(to)
        )
    }

    fn column_list(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.dialect.quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Primary key column of every table the diff knows, for foreign keys
/// without an explicit referenced column.
struct PrimaryKeys(HashMap<String, String>);

impl PrimaryKeys {
    fn from_diff(diff: &SchemaDiff) -> Self {
        let map = diff
            .tables_to_create
            .iter()
            .chain(&diff.tables_to_modify)
            .filter_map(|t| {
                t.table
                    .primary_key()
                    .map(|pk| (t.name().to_lowercase(), pk.name.clone()))
            })
            .collect();
        Self(map)
    }

    fn referenced_column(&self, fk: &ForeignKey) -> String {
        fk.referenced_column.clone().unwrap_or_else(|| {
            self.0
                .get(&fk.referenced_table.to_lowercase())
                .cloned()
                .unwrap_or_else(|| "id".to_string())
        })
    }
}

fn join(stmts: Vec<String>) -> String {
    stmts.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Sqlite;
    use crate::diff::{Change, Rename, SchemaDiffer};
    use pretty_assertions::assert_eq;
    use strata_schema::{Column, ForeignKey, Index, ReferentialAction, Schema, Table};

    fn id() -> Column {
        Column::new("id", "int").primary_key().auto_increment()
    }

    fn create_diff(tables: Vec<Table>) -> SchemaDiff {
        SchemaDiffer::new(Schema::from_tables(tables).unwrap())
            .diff()
            .unwrap()
    }

    #[test]
    fn test_create_table() {
        let diff = create_diff(vec![Table::new("users")
            .column(id())
            .column(Column::new("name", "varchar"))
            .column(Column::new("email", "string").size(320).not_null().unique())
            .column(Column::new("active", "bool").default_value("true"))]);

        let up = SqlGenerator::postgres().generate_up(&diff).unwrap();
        assert_eq!(
            up,
            "CREATE TABLE \"users\" (\n    \"id\" SERIAL NOT NULL PRIMARY KEY,\n    \"name\" varchar(255),\n    \"email\" varchar(320) NOT NULL UNIQUE,\n    \"active\" boolean DEFAULT true\n);"
        );
    }

    #[test]
    fn test_primary_key_default_omitted() {
        let generator = SqlGenerator::postgres();
        let column = Column::new("id", "uuid").primary_key().default_value("gen_random_uuid()");
        assert_eq!(generator.column_definition(&column), "\"id\" uuid NOT NULL PRIMARY KEY");
    }

    #[test]
    fn test_foreign_keys_and_indexes_in_create() {
        let diff = create_diff(vec![
            Table::new("orders")
                .column(id())
                .column(Column::new("user_id", "int").not_null())
                .column(Column::new("code", "varchar"))
                .index(Index::new("idx_orders_user_id", ["user_id"]))
                .index(Index::new("uq_orders_code", ["code"]).unique())
                .foreign_key(ForeignKey::new("user_id", "users")),
            Table::new("users").column(id()),
        ]);

        let up = SqlGenerator::postgres().generate_up(&diff).unwrap();
        let users = up.find("CREATE TABLE \"users\"").unwrap();
        let orders = up.find("CREATE TABLE \"orders\"").unwrap();
        assert!(users < orders);
        assert!(up.contains(
            "CONSTRAINT fk_orders_user_id_fkey FOREIGN KEY (\"user_id\") REFERENCES \"users\"(id) ON DELETE CASCADE"
        ));
        assert!(up.contains("CONSTRAINT uq_orders_code UNIQUE (\"code\")"));
        assert!(up.contains("CREATE INDEX idx_orders_user_id ON \"orders\" (\"user_id\");"));
        assert!(!up.contains("CREATE UNIQUE INDEX"));
    }

    #[test]
    fn test_referenced_column_resolution() {
        let diff = create_diff(vec![
            Table::new("accounts").column(Column::new("code", "varchar").primary_key()),
            Table::new("invoices")
                .column(id())
                .column(Column::new("account_code", "varchar"))
                .column(Column::new("owner_id", "int"))
                .foreign_key(ForeignKey::new("account_code", "accounts"))
                .foreign_key(
                    ForeignKey::new("owner_id", "people")
                        .references_column("person_id")
                        .on_delete(ReferentialAction::SetNull),
                ),
        ]);

        let up = SqlGenerator::postgres().generate_up(&diff).unwrap();
        assert!(up.contains("REFERENCES \"accounts\"(code) ON DELETE CASCADE"));
        assert!(up.contains("REFERENCES \"people\"(person_id) ON DELETE SET NULL"));
    }

    #[test]
    fn test_down_drops_in_reverse_dependency_order() {
        let diff = create_diff(vec![
            Table::new("orders")
                .column(id())
                .column(Column::new("user_id", "int"))
                .index(Index::new("idx_orders_user_id", ["user_id"]))
                .foreign_key(ForeignKey::new("user_id", "users")),
            Table::new("users").column(id()),
        ]);

        let down = SqlGenerator::postgres().generate_down(&diff);
        assert_eq!(
            down,
            [
                "DROP INDEX IF EXISTS idx_orders_user_id;",
                "ALTER TABLE \"orders\" DROP CONSTRAINT IF EXISTS fk_orders_user_id_fkey;",
                "DROP TABLE IF EXISTS \"orders\";",
                "DROP TABLE IF EXISTS \"users\";",
            ]
            .join("\n\n")
        );
    }

    #[test]
    fn test_cycle_aborts_up() {
        let diff = create_diff(vec![
            Table::new("a")
                .column(id())
                .column(Column::new("b_id", "int"))
                .foreign_key(ForeignKey::new("b_id", "b")),
            Table::new("b")
                .column(id())
                .column(Column::new("a_id", "int"))
                .foreign_key(ForeignKey::new("a_id", "a")),
        ]);

        let generator = SqlGenerator::postgres();
        assert!(generator.generate_up(&diff).is_err());
        assert!(generator.generate(&diff).is_err());
        // Down still renders, in reverse declaration order.
        let down = generator.generate_down(&diff);
        assert!(down.find("\"b\";").unwrap() < down.find("\"a\";").unwrap());
    }

    #[test]
    fn test_alter_table_statements() {
        let table = TableDiff {
            columns_to_add: vec![Column::new("email", "varchar").not_null()],
            columns_to_drop: vec![Column::new("legacy", "text").default_value("'x'")],
            columns_to_rename: vec![Rename::new("mail", "contact")],
            foreign_keys_to_add: vec![ForeignKey::new("team_id", "teams")],
            indexes_to_add: vec![Index::new("idx_users_email", ["email"]).unique()],
            ..TableDiff::new(Table::new("users").column(id()))
        };
        let diff = SchemaDiff {
            tables_to_modify: vec![table],
            ..Default::default()
        };

        let sql = SqlGenerator::postgres().generate(&diff).unwrap();
        assert_eq!(
            sql.up,
            [
                "ALTER TABLE \"users\" RENAME COLUMN \"mail\" TO \"contact\";",
                "ALTER TABLE \"users\" ADD COLUMN \"email\" varchar(255) NOT NULL;",
                "ALTER TABLE \"users\" DROP COLUMN \"legacy\";",
                "ALTER TABLE \"users\" ADD CONSTRAINT fk_users_team_id_fkey FOREIGN KEY (\"team_id\") REFERENCES \"teams\"(id) ON DELETE CASCADE;",
                "CREATE UNIQUE INDEX idx_users_email ON \"users\" (\"email\");",
            ]
            .join("\n\n")
        );
        assert_eq!(
            sql.down,
            [
                "DROP INDEX IF EXISTS idx_users_email;",
                "ALTER TABLE \"users\" DROP CONSTRAINT IF EXISTS fk_users_team_id_fkey;",
                "ALTER TABLE \"users\" DROP COLUMN \"email\";",
                "ALTER TABLE \"users\" ADD COLUMN \"legacy\" text DEFAULT 'x';",
                "ALTER TABLE \"users\" RENAME COLUMN \"contact\" TO \"mail\";",
            ]
            .join("\n\n")
        );
    }

    #[test]
    fn test_alter_column() {
        let generator = SqlGenerator::postgres();
        let change = Change {
            from: Column::new("age", "int"),
            to: Column::new("age", "bigint(20)").not_null().default_value("0").unique(),
        };
        // int and bigint normalize to the same type: no TYPE change.
        let stmts = generator.alter_column("people", &change);
        assert_eq!(
            stmts,
            vec![
                "ALTER TABLE \"people\" ALTER COLUMN \"age\" SET NOT NULL;".to_string(),
                "ALTER TABLE \"people\" ALTER COLUMN \"age\" SET DEFAULT 0;".to_string(),
                "ALTER TABLE \"people\" ADD CONSTRAINT people_age_key UNIQUE (\"age\");".to_string(),
            ]
        );

        let change = Change {
            from: Column::new("score", "int").default_value("1"),
            to: Column::new("score", "decimal(5,2)"),
        };
        let stmts = generator.alter_column("people", &change);
        assert_eq!(
            stmts,
            vec![
                "ALTER TABLE \"people\" ALTER COLUMN \"score\" TYPE decimal(5,2) USING \"score\"::decimal(5,2);".to_string(),
                "ALTER TABLE \"people\" ALTER COLUMN \"score\" DROP DEFAULT;".to_string(),
            ]
        );
    }

    #[test]
    fn test_alter_primary_key_type_avoids_serial() {
        let generator = SqlGenerator::postgres();
        let change = Change {
            from: Column::new("id", "uuid").primary_key(),
            to: Column::new("id", "int").primary_key().auto_increment(),
        };
        let stmts = generator.alter_column("users", &change);
        assert!(stmts[0].starts_with(MANUAL_INTERVENTION));
        assert_eq!(
            stmts[1],
            "ALTER TABLE \"users\" ALTER COLUMN \"id\" TYPE integer USING \"id\"::integer;"
        );
        assert!(stmts.iter().all(|stmt| !stmt.contains("SERIAL")));
    }

    #[test]
    fn test_modified_column_down_is_placeholder() {
        let table = TableDiff {
            columns_to_modify: vec![Change {
                from: Column::new("bio", "varchar"),
                to: Column::new("bio", "text").not_null(),
            }],
            ..TableDiff::new(Table::new("users"))
        };
        let diff = SchemaDiff {
            tables_to_modify: vec![table],
            ..Default::default()
        };

        let sql = SqlGenerator::postgres().generate(&diff).unwrap();
        assert!(sql.needs_manual_rollback());
        assert_eq!(
            sql.down,
            "-- MANUAL INTERVENTION REQUIRED: revert column \"users\".\"bio\" to \"bio\" varchar(255)"
        );
    }

    #[test]
    fn test_drop_and_rename_tables() {
        let diff = SchemaDiff {
            tables_to_drop: vec!["audit_log".to_string()],
            tables_to_rename: vec![Rename::new("people", "users")],
            ..Default::default()
        };

        let sql = SqlGenerator::postgres().generate(&diff).unwrap();
        assert_eq!(
            sql.up,
            "ALTER TABLE \"people\" RENAME TO \"users\";\n\nDROP TABLE IF EXISTS \"audit_log\" CASCADE;"
        );
        assert_eq!(
            sql.down,
            "-- MANUAL INTERVENTION REQUIRED: recreate dropped table \"audit_log\"\n\nALTER TABLE \"users\" RENAME TO \"people\";"
        );
    }

    #[test]
    fn test_generation_is_deterministic() {
        let diff = create_diff(vec![
            Table::new("users").column(id()),
            Table::new("posts")
                .column(id())
                .column(Column::new("author_id", "int"))
                .foreign_key(ForeignKey::new("author_id", "users")),
        ]);
        let generator = SqlGenerator::postgres();
        assert_eq!(generator.generate(&diff).unwrap(), generator.generate(&diff).unwrap());
    }

    #[test]
    fn test_sqlite_dialect() {
        let diff = create_diff(vec![Table::new("users")
            .column(id())
            .column(Column::new("name", "varchar"))]);
        let up = SqlGenerator::new(&Sqlite).generate_up(&diff).unwrap();
        assert!(up.contains("\"id\" INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT"));
        assert!(up.contains("\"name\" TEXT"));

        let table = TableDiff {
            columns_to_modify: vec![Change {
                from: Column::new("name", "varchar"),
                to: Column::new("name", "varchar").not_null(),
            }],
            foreign_keys_to_add: vec![ForeignKey::new("team_id", "teams")],
            ..TableDiff::new(Table::new("users"))
        };
        let diff = SchemaDiff {
            tables_to_modify: vec![table],
            ..Default::default()
        };
        let up = SqlGenerator::new(&Sqlite).generate_up(&diff).unwrap();
        assert!(!up.contains("ALTER COLUMN"));
        assert_eq!(up.matches(MANUAL_INTERVENTION).count(), 2);
    }
}
