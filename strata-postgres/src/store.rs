//! Transactional migration history backed by a ledger table.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use strata_migrate::{
    DEFAULT_MIGRATIONS_TABLE, MigrateResult, MigrationError, MigrationFile,
    MigrationHistoryRepository, MigrationRecord, postgres_init_sql,
};
use tracing::{debug, info};

use crate::connection::PgConnection;
use crate::error::PgError;

/// Applies migrations and records them in one transaction each.
#[derive(Clone)]
pub struct PgMigrationStore {
    conn: Arc<PgConnection>,
    table: String,
}

impl PgMigrationStore {
    /// Store using the default `schema_migrations` ledger.
    pub fn new(conn: Arc<PgConnection>) -> Self {
        Self::with_table(conn, DEFAULT_MIGRATIONS_TABLE)
    }

    /// Store using a custom ledger table.
    pub fn with_table(conn: Arc<PgConnection>, table: impl Into<String>) -> Self {
        Self {
            conn,
            table: table.into(),
        }
    }

    /// Name of the ledger table.
    pub fn table(&self) -> &str {
        &self.table
    }

    fn quoted_table(&self) -> String {
        format!("\"{}\"", self.table.replace('"', "\"\""))
    }
}

#[async_trait::async_trait]
impl MigrationHistoryRepository for PgMigrationStore {
    async fn initialize(&self) -> MigrateResult<()> {
        self.conn.batch_execute(&postgres_init_sql(&self.table)).await?;
        debug!(table = %self.table, "Initialized migration ledger");
        Ok(())
    }

    async fn get_applied(&self) -> MigrateResult<Vec<MigrationRecord>> {
        let sql = format!(
            "SELECT version, name, checksum, applied_at FROM {} ORDER BY version",
            self.quoted_table()
        );
        let rows = self.conn.query(&sql, &[]).await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(MigrationRecord {
                version: row.try_get("version").map_err(PgError::from)?,
                name: row.try_get("name").map_err(PgError::from)?,
                checksum: row.try_get("checksum").map_err(PgError::from)?,
                applied_at: row
                    .try_get::<_, DateTime<Utc>>("applied_at")
                    .map_err(PgError::from)?,
            });
        }
        Ok(records)
    }

    async fn apply(&self, migration: &MigrationFile) -> MigrateResult<MigrationRecord> {
        let mut client = self.conn.lock().await;
        let tx = client.transaction().await.map_err(PgError::from)?;

        // Dropping the transaction without commit rolls it back
        tx.batch_execute(&migration.up_sql)
            .await
            .map_err(|e| MigrationError::apply(&migration.version, e.to_string()))?;

        let sql = format!(
            "INSERT INTO {} (version, name, checksum) VALUES ($1, $2, $3) RETURNING applied_at",
            self.quoted_table()
        );
        let row = tx
            .query_one(
                &sql,
                &[&migration.version, &migration.name, &migration.checksum],
            )
            .await
            .map_err(|e| MigrationError::apply(&migration.version, e.to_string()))?;
        let applied_at: DateTime<Utc> = row.try_get(0).map_err(PgError::from)?;

        tx.commit()
            .await
            .map_err(|e| MigrationError::apply(&migration.version, e.to_string()))?;

        info!(version = %migration.version, "Committed migration");
        Ok(MigrationRecord {
            version: migration.version.clone(),
            name: migration.name.clone(),
            checksum: migration.checksum.clone(),
            applied_at,
        })
    }

    async fn revert(&self, migration: &MigrationFile) -> MigrateResult<()> {
        let mut client = self.conn.lock().await;
        let tx = client.transaction().await.map_err(PgError::from)?;

        tx.batch_execute(&migration.down_sql)
            .await
            .map_err(|e| MigrationError::apply(&migration.version, e.to_string()))?;

        let sql = format!("DELETE FROM {} WHERE version = $1", self.quoted_table());
        let deleted = tx
            .execute(&sql, &[&migration.version])
            .await
            .map_err(PgError::from)?;
        if deleted == 0 {
            return Err(MigrationError::NotFound(migration.version.clone()));
        }

        tx.commit().await.map_err(PgError::from)?;
        info!(version = %migration.version, "Reverted migration");
        Ok(())
    }
}
