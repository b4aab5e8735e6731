//! Reading the current schema from a live database.
//!
//! Each database implements the small [`Introspector`] capability; the
//! [`introspect_schema`] driver assembles a [`Schema`] from it. The result is
//! all-or-nothing: any failure discards what was fetched so far, and transient
//! connection failures restart the whole fetch.

use std::time::Duration;

use strata_schema::{Column, ForeignKey, Index, Schema, Table};
use tracing::{debug, warn};

use crate::error::{MigrateResult, MigrationError};

/// Default name of the applied-migrations ledger table.
pub const DEFAULT_MIGRATIONS_TABLE: &str = "schema_migrations";

/// Configuration for introspection.
#[derive(Debug, Clone)]
pub struct IntrospectionConfig {
    /// Tables to leave out of the schema. Compared case-insensitively.
    pub exclude_tables: Vec<String>,
    /// Attempts before a transient failure is reported.
    pub max_attempts: u32,
    /// Delay before the first retry. Doubles on each further retry.
    pub retry_backoff: Duration,
}

impl Default for IntrospectionConfig {
    fn default() -> Self {
        Self {
            exclude_tables: vec![DEFAULT_MIGRATIONS_TABLE.to_string()],
            max_attempts: 3,
            retry_backoff: Duration::from_millis(200),
        }
    }
}

impl IntrospectionConfig {
    /// Create a new introspection config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclude these tables.
    pub fn exclude_tables<S: Into<String>>(mut self, tables: impl IntoIterator<Item = S>) -> Self {
        self.exclude_tables = tables.into_iter().map(Into::into).collect();
        self
    }

    /// Exclude one more table.
    pub fn exclude_table(mut self, table: impl Into<String>) -> Self {
        self.exclude_tables.push(table.into());
        self
    }

    /// Set the number of attempts. Zero is treated as one.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the initial retry delay.
    pub fn retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Check if a table should be included.
    pub fn should_include_table(&self, name: &str) -> bool {
        !self
            .exclude_tables
            .iter()
            .any(|excluded| excluded.eq_ignore_ascii_case(name))
    }
}

/// Catalog queries one database dialect must answer.
#[async_trait::async_trait]
pub trait Introspector: Send + Sync {
    /// Names of the user tables.
    async fn list_tables(&self) -> MigrateResult<Vec<String>>;

    /// Columns of a table, in ordinal order, with types as the catalog spells them.
    async fn column_types(&self, table: &str) -> MigrateResult<Vec<Column>>;

    /// Indexes of a table, excluding the primary key index.
    async fn list_indexes(&self, table: &str) -> MigrateResult<Vec<Index>>;

    /// Foreign keys declared on a table.
    async fn list_foreign_keys(&self, table: &str) -> MigrateResult<Vec<ForeignKey>>;
}

/// Build the current schema, retrying transient failures.
pub async fn introspect_schema(
    introspector: &dyn Introspector,
    config: &IntrospectionConfig,
) -> MigrateResult<Schema> {
    let attempts = config.max_attempts.max(1);
    let mut backoff = config.retry_backoff;
    let mut attempt = 1;

    loop {
        match fetch_schema(introspector, config).await {
            Ok(schema) => {
                debug!(tables = schema.len(), attempt, "Introspected schema");
                return Ok(schema);
            }
            Err(e) if e.is_transient() && attempt < attempts => {
                warn!(error = %e, attempt, "Introspection failed, retrying");
                tokio::time::sleep(backoff).await;
                backoff = backoff.saturating_mul(2);
                attempt += 1;
            }
            Err(e @ MigrationError::Connection(_)) => return Err(e),
            Err(MigrationError::Introspection(msg)) => {
                return Err(MigrationError::Introspection(msg));
            }
            Err(e) => return Err(MigrationError::introspection(e.to_string())),
        }
    }
}

async fn fetch_schema(
    introspector: &dyn Introspector,
    config: &IntrospectionConfig,
) -> MigrateResult<Schema> {
    let mut schema = Schema::new();

    for name in introspector.list_tables().await? {
        if !config.should_include_table(&name) {
            debug!(table = %name, "Skipping excluded table");
            continue;
        }

        let mut table = Table::new(name.as_str());
        table.columns = introspector.column_types(&name).await?;
        table.indexes = introspector.list_indexes(&name).await?;
        table.foreign_keys = introspector.list_foreign_keys(&name).await?;

        schema
            .add_table(table)
            .map_err(|e| MigrationError::introspection(e.to_string()))?;
    }

    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Serves a fixed catalog, failing the first `failures` table listings.
    struct FakeCatalog {
        tables: HashMap<String, Table>,
        order: Vec<String>,
        failures: u32,
        calls: AtomicU32,
        broken_table: Option<String>,
    }

    impl FakeCatalog {
        fn new(tables: Vec<Table>) -> Self {
            Self {
                order: tables.iter().map(|t| t.name.clone()).collect(),
                tables: tables.into_iter().map(|t| (t.name.clone(), t)).collect(),
                failures: 0,
                calls: AtomicU32::new(0),
                broken_table: None,
            }
        }

        fn table(&self, name: &str) -> MigrateResult<&Table> {
            if self.broken_table.as_deref() == Some(name) {
                return Err(MigrationError::database("permission denied"));
            }
            self.tables
                .get(name)
                .ok_or_else(|| MigrationError::NotFound(name.to_string()))
        }
    }

    #[async_trait::async_trait]
    impl Introspector for FakeCatalog {
        async fn list_tables(&self) -> MigrateResult<Vec<String>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(MigrationError::connection("connection reset"));
            }
            Ok(self.order.clone())
        }

        async fn column_types(&self, table: &str) -> MigrateResult<Vec<Column>> {
            Ok(self.table(table)?.columns.clone())
        }

        async fn list_indexes(&self, table: &str) -> MigrateResult<Vec<Index>> {
            Ok(self.table(table)?.indexes.clone())
        }

        async fn list_foreign_keys(&self, table: &str) -> MigrateResult<Vec<ForeignKey>> {
            Ok(self.table(table)?.foreign_keys.clone())
        }
    }

    fn catalog() -> Vec<Table> {
        vec![
            Table::new("users").column(Column::new("id", "integer").primary_key()),
            Table::new("orders")
                .column(Column::new("id", "integer").primary_key())
                .column(Column::new("user_id", "integer"))
                .foreign_key(ForeignKey::new("user_id", "users")),
            Table::new("schema_migrations").column(Column::new("version", "varchar")),
        ]
    }

    fn fast() -> IntrospectionConfig {
        IntrospectionConfig::new().retry_backoff(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_introspect_excludes_ledger() {
        let schema = introspect_schema(&FakeCatalog::new(catalog()), &fast())
            .await
            .unwrap();
        let names: Vec<&str> = schema.table_names().collect();
        assert_eq!(names, vec!["users", "orders"]);
        assert_eq!(schema.get("orders").unwrap().foreign_keys.len(), 1);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let mut fake = FakeCatalog::new(catalog());
        fake.failures = 2;
        let schema = introspect_schema(&fake, &fast()).await.unwrap();
        assert_eq!(schema.len(), 2);
        assert_eq!(fake.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let mut fake = FakeCatalog::new(catalog());
        fake.failures = 10;
        let err = introspect_schema(&fake, &fast().max_attempts(2))
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert_eq!(fake.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_partial_failure_discards_schema() {
        let mut fake = FakeCatalog::new(catalog());
        fake.broken_table = Some("orders".to_string());
        let err = introspect_schema(&fake, &fast()).await.unwrap_err();
        assert!(matches!(err, MigrationError::Introspection(_)));
        assert!(err.to_string().contains("permission denied"));
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_should_include_table() {
        let config = IntrospectionConfig::new().exclude_table("Audit");
        assert!(!config.should_include_table("SCHEMA_MIGRATIONS"));
        assert!(!config.should_include_table("audit"));
        assert!(config.should_include_table("users"));
    }
}
