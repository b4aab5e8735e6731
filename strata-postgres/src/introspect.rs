//! Catalog introspection for PostgreSQL.

use std::sync::Arc;

use strata_migrate::{Introspector, MigrateResult};
use strata_schema::{Column, ForeignKey, Index, ReferentialAction};
use tokio_postgres::Row;
use tracing::{debug, warn};

use crate::connection::PgConnection;
use crate::error::{PgError, PgResult};

/// SQL queries for PostgreSQL introspection.
///
/// information_schema columns are domain types, so every one is cast to a
/// base type the driver can decode.
pub mod queries {
    /// User tables in a schema.
    pub const TABLES: &str = r#"
SELECT table_name::text
FROM information_schema.tables
WHERE table_schema = $1 AND table_type = 'BASE TABLE'
ORDER BY table_name
"#;

    /// Columns of one table with key flags. Only single-column UNIQUE
    /// constraints mark a column unique.
    pub const COLUMNS: &str = r#"
SELECT
    c.column_name::text AS name,
    c.data_type::text AS data_type,
    c.is_nullable::text = 'YES' AS nullable,
    c.column_default::text AS column_default,
    c.character_maximum_length::int4 AS size,
    c.numeric_precision::int4 AS precision,
    c.numeric_scale::int4 AS scale,
    EXISTS (
        SELECT 1
        FROM information_schema.table_constraints tc
        JOIN information_schema.key_column_usage kcu
          ON kcu.constraint_name = tc.constraint_name
         AND kcu.table_schema = tc.table_schema
        WHERE tc.table_schema = c.table_schema
          AND tc.table_name = c.table_name
          AND tc.constraint_type = 'PRIMARY KEY'
          AND kcu.column_name = c.column_name
    ) AS primary_key,
    EXISTS (
        SELECT 1
        FROM information_schema.table_constraints tc
        JOIN information_schema.key_column_usage kcu
          ON kcu.constraint_name = tc.constraint_name
         AND kcu.table_schema = tc.table_schema
        WHERE tc.table_schema = c.table_schema
          AND tc.table_name = c.table_name
          AND tc.constraint_type = 'UNIQUE'
          AND kcu.column_name = c.column_name
          AND (
              SELECT count(*)
              FROM information_schema.key_column_usage k
              WHERE k.constraint_name = tc.constraint_name
                AND k.table_schema = tc.table_schema
          ) = 1
    ) AS is_unique
FROM information_schema.columns c
WHERE c.table_schema = $1 AND c.table_name = $2
ORDER BY c.ordinal_position
"#;

    /// Non-primary indexes of one table.
    pub const INDEXES: &str = r#"
SELECT
    i.relname::text AS name,
    ix.indisunique AS is_unique,
    array_agg(a.attname::text ORDER BY array_position(ix.indkey::int2[], a.attnum)) AS columns
FROM pg_class t
JOIN pg_namespace n ON n.oid = t.relnamespace
JOIN pg_index ix ON ix.indrelid = t.oid
JOIN pg_class i ON i.oid = ix.indexrelid
JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey)
WHERE n.nspname = $1 AND t.relname = $2 AND NOT ix.indisprimary
GROUP BY i.relname, ix.indisunique
ORDER BY i.relname
"#;

    /// Foreign keys declared on one table.
    pub const FOREIGN_KEYS: &str = r#"
SELECT
    tc.constraint_name::text AS name,
    kcu.column_name::text AS column_name,
    ccu.table_name::text AS referenced_table,
    ccu.column_name::text AS referenced_column,
    rc.delete_rule::text AS delete_rule
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
  ON kcu.constraint_name = tc.constraint_name
 AND kcu.table_schema = tc.table_schema
JOIN information_schema.constraint_column_usage ccu
  ON ccu.constraint_name = tc.constraint_name
 AND ccu.constraint_schema = tc.table_schema
JOIN information_schema.referential_constraints rc
  ON rc.constraint_name = tc.constraint_name
 AND rc.constraint_schema = tc.table_schema
WHERE tc.constraint_type = 'FOREIGN KEY'
  AND tc.table_schema = $1
  AND tc.table_name = $2
ORDER BY tc.constraint_name, kcu.ordinal_position
"#;
}

/// Reads tables, columns, indexes and foreign keys from the catalog.
#[derive(Clone)]
pub struct PgIntrospector {
    conn: Arc<PgConnection>,
}

impl PgIntrospector {
    pub fn new(conn: Arc<PgConnection>) -> Self {
        Self { conn }
    }

    async fn rows(&self, sql: &str, table: &str) -> PgResult<Vec<Row>> {
        let schema = self.conn.schema();
        self.conn.query(sql, &[&schema, &table]).await
    }
}

#[async_trait::async_trait]
impl Introspector for PgIntrospector {
    async fn list_tables(&self) -> MigrateResult<Vec<String>> {
        let schema = self.conn.schema();
        let rows = self.conn.query(queries::TABLES, &[&schema]).await?;
        let tables = rows
            .iter()
            .map(|row| row.try_get::<_, String>(0))
            .collect::<Result<Vec<_>, _>>()
            .map_err(PgError::from)?;
        debug!(schema = %schema, count = tables.len(), "Listed tables");
        Ok(tables)
    }

    async fn column_types(&self, table: &str) -> MigrateResult<Vec<Column>> {
        let rows = self.rows(queries::COLUMNS, table).await?;
        Ok(rows
            .iter()
            .map(column_from_row)
            .collect::<PgResult<Vec<_>>>()?)
    }

    async fn list_indexes(&self, table: &str) -> MigrateResult<Vec<Index>> {
        let rows = self.rows(queries::INDEXES, table).await?;
        let mut indexes = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = row.try_get("name").map_err(PgError::from)?;
            let columns: Vec<String> = row.try_get("columns").map_err(PgError::from)?;
            let unique: bool = row.try_get("is_unique").map_err(PgError::from)?;
            let index = Index::new(name, columns);
            indexes.push(if unique { index.unique() } else { index });
        }
        Ok(indexes)
    }

    async fn list_foreign_keys(&self, table: &str) -> MigrateResult<Vec<ForeignKey>> {
        let rows = self.rows(queries::FOREIGN_KEYS, table).await?;
        Ok(rows
            .iter()
            .map(foreign_key_from_row)
            .collect::<PgResult<Vec<_>>>()?)
    }
}

fn column_from_row(row: &Row) -> PgResult<Column> {
    let name: String = row.try_get("name")?;
    let data_type: String = row.try_get("data_type")?;
    let mut column = Column::new(name, data_type.as_str());

    column.nullable = row.try_get("nullable")?;
    column.primary_key = row.try_get("primary_key")?;
    column.unique = row.try_get::<_, bool>("is_unique")? && !column.primary_key;
    column.default = row
        .try_get::<_, Option<String>>("column_default")?
        .unwrap_or_default();

    column.size = positive(row.try_get("size")?);
    if matches!(data_type.as_str(), "numeric" | "decimal") {
        column.precision = positive(row.try_get("precision")?);
        column.scale = row
            .try_get::<_, Option<i32>>("scale")?
            .and_then(|s| u32::try_from(s).ok());
    }

    Ok(column)
}

fn foreign_key_from_row(row: &Row) -> PgResult<ForeignKey> {
    let name: String = row.try_get("name")?;
    let column: String = row.try_get("column_name")?;
    let referenced_table: String = row.try_get("referenced_table")?;
    let referenced_column: String = row.try_get("referenced_column")?;
    let rule: String = row.try_get("delete_rule")?;

    let on_delete = ReferentialAction::from_rule(&rule).unwrap_or_else(|| {
        warn!(constraint = %name, rule = %rule, "Unknown delete rule");
        ReferentialAction::NoAction
    });

    Ok(ForeignKey::new(column, referenced_table)
        .references_column(referenced_column)
        .named(name)
        .on_delete(on_delete))
}

fn positive(value: Option<i32>) -> Option<u32> {
    value.and_then(|v| u32::try_from(v).ok()).filter(|v| *v > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive() {
        assert_eq!(positive(Some(255)), Some(255));
        assert_eq!(positive(Some(0)), None);
        assert_eq!(positive(Some(-1)), None);
        assert_eq!(positive(None), None);
    }

    #[test]
    fn test_queries_filter_by_schema_and_table() {
        for sql in [queries::COLUMNS, queries::INDEXES, queries::FOREIGN_KEYS] {
            assert!(sql.contains("$1"));
            assert!(sql.contains("$2"));
        }
        assert!(queries::TABLES.contains("BASE TABLE"));
        assert!(queries::INDEXES.contains("NOT ix.indisprimary"));
    }
}
