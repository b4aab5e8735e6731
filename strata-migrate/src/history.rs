//! Migration history tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{MigrateResult, MigrationError};
use crate::file::MigrationFile;

/// A record of an applied migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// Timestamp version.
    pub version: String,
    /// Migration name.
    pub name: String,
    /// Checksum of the up SQL when it was applied.
    pub checksum: String,
    /// When the migration was applied.
    pub applied_at: DateTime<Utc>,
}

impl MigrationRecord {
    /// Record for a migration applied now.
    pub fn applied_now(file: &MigrationFile) -> Self {
        Self {
            version: file.version.clone(),
            name: file.name.clone(),
            checksum: file.checksum.clone(),
            applied_at: Utc::now(),
        }
    }
}

/// Migration history repository.
///
/// Implementations run each migration's SQL and its ledger update in one
/// transaction, so a failed statement leaves neither behind.
#[async_trait::async_trait]
pub trait MigrationHistoryRepository: Send + Sync {
    /// Initialize the ledger table.
    async fn initialize(&self) -> MigrateResult<()>;

    /// Get all applied migrations in ascending version order.
    async fn get_applied(&self) -> MigrateResult<Vec<MigrationRecord>>;

    /// Run the up SQL and record the migration.
    ///
    /// Fails with [`MigrationError::Apply`] when a statement fails.
    async fn apply(&self, migration: &MigrationFile) -> MigrateResult<MigrationRecord>;

    /// Run the down SQL and remove the migration's record.
    async fn revert(&self, migration: &MigrationFile) -> MigrateResult<()>;

    /// Get the last applied migration.
    async fn get_last_applied(&self) -> MigrateResult<Option<MigrationRecord>> {
        Ok(self.get_applied().await?.pop())
    }
}

/// SQL creating the ledger table (PostgreSQL).
pub fn postgres_init_sql(table: &str) -> String {
    format!(
        r#"CREATE TABLE IF NOT EXISTS "{table}" (
    version VARCHAR(14) PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    checksum VARCHAR(64) NOT NULL,
    applied_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
)"#
    )
}

/// In-process ledger. Records migrations without executing their SQL.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    records: Mutex<Vec<MigrationRecord>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing records.
    pub fn with_records(records: Vec<MigrationRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

#[async_trait::async_trait]
impl MigrationHistoryRepository for MemoryHistory {
    async fn initialize(&self) -> MigrateResult<()> {
        Ok(())
    }

    async fn get_applied(&self) -> MigrateResult<Vec<MigrationRecord>> {
        let mut records = self.records.lock().await.clone();
        records.sort_by(|a, b| a.version.cmp(&b.version));
        Ok(records)
    }

    async fn apply(&self, migration: &MigrationFile) -> MigrateResult<MigrationRecord> {
        let mut records = self.records.lock().await;
        if records.iter().any(|r| r.version == migration.version) {
            return Err(MigrationError::apply(
                &migration.version,
                "migration is already recorded",
            ));
        }
        let record = MigrationRecord::applied_now(migration);
        records.push(record.clone());
        Ok(record)
    }

    async fn revert(&self, migration: &MigrationFile) -> MigrateResult<()> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|r| r.version != migration.version);
        if records.len() == before {
            return Err(MigrationError::NotFound(migration.version.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::MigrationSql;

    fn file(version: &str) -> MigrationFile {
        MigrationFile::new(
            version,
            "create_users",
            MigrationSql {
                up: "CREATE TABLE users();".to_string(),
                down: "DROP TABLE users;".to_string(),
            },
        )
    }

    #[test]
    fn test_migration_record() {
        let record = MigrationRecord::applied_now(&file("20231215120000"));
        assert_eq!(record.version, "20231215120000");
        assert_eq!(record.name, "create_users");
        assert_eq!(record.checksum.len(), 64);
    }

    #[test]
    fn test_init_sql_has_table() {
        let sql = postgres_init_sql("schema_migrations");
        assert!(sql.contains("\"schema_migrations\""));
        assert!(sql.contains("checksum"));
    }

    #[tokio::test]
    async fn test_memory_history() {
        let history = MemoryHistory::new();
        history.apply(&file("20240102000000")).await.unwrap();
        history.apply(&file("20240101000000")).await.unwrap();

        let versions: Vec<String> = history
            .get_applied()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.version)
            .collect();
        assert_eq!(versions, vec!["20240101000000", "20240102000000"]);

        let last = history.get_last_applied().await.unwrap().unwrap();
        assert_eq!(last.version, "20240102000000");

        assert!(history.apply(&file("20240101000000")).await.is_err());

        history.revert(&file("20240102000000")).await.unwrap();
        assert_eq!(history.get_applied().await.unwrap().len(), 1);
        assert!(history.revert(&file("20240102000000")).await.is_err());
    }
}
