//! Migration engine implementation.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

use strata_schema::Schema;
use tracing::{debug, info, warn};

use crate::dialect::DialectKind;
use crate::diff::{SchemaDiff, SchemaDiffer};
use crate::error::{MigrateResult, MigrationError};
use crate::file::{MigrationFile, MigrationFileManager};
use crate::history::{MigrationHistoryRepository, MigrationRecord};
use crate::sql::{MigrationSql, SqlGenerator};
use crate::validate::Validator;

/// Configuration for the migration engine.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Path to the migrations directory.
    pub migrations_dir: PathBuf,
    /// Whether to run in dry-run mode.
    pub dry_run: bool,
    /// Whether dropping tables or columns is planned without warnings.
    pub allow_data_loss: bool,
    /// Whether an edited, already-applied migration stops `migrate`.
    pub fail_on_checksum_mismatch: bool,
    /// Column removal policy for existing tables.
    pub drop_columns: bool,
    /// SQL dialect of generated migrations.
    pub dialect: DialectKind,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            migrations_dir: PathBuf::from("./migrations"),
            dry_run: false,
            allow_data_loss: false,
            fail_on_checksum_mismatch: true,
            drop_columns: true,
            dialect: DialectKind::default(),
        }
    }
}

impl MigrationConfig {
    /// Create a new configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the migrations directory.
    pub fn migrations_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.migrations_dir = dir.into();
        self
    }

    /// Enable dry-run mode.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Allow data loss operations.
    pub fn allow_data_loss(mut self, allow: bool) -> Self {
        self.allow_data_loss = allow;
        self
    }

    /// Set whether to fail on checksum mismatches.
    pub fn fail_on_checksum_mismatch(mut self, fail: bool) -> Self {
        self.fail_on_checksum_mismatch = fail;
        self
    }

    /// Set the column removal policy.
    pub fn drop_columns(mut self, enabled: bool) -> Self {
        self.drop_columns = enabled;
        self
    }

    /// Set the SQL dialect.
    pub fn dialect(mut self, dialect: DialectKind) -> Self {
        self.dialect = dialect;
        self
    }
}

/// A validated diff and the SQL generated for it.
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    pub diff: SchemaDiff,
    pub sql: MigrationSql,
    /// Data-loss and manual-intervention warnings.
    pub warnings: Vec<String>,
}

impl MigrationPlan {
    /// Whether applying the plan discards data.
    pub fn has_data_loss(&self) -> bool {
        self.diff.is_destructive()
    }

    /// Get a summary of the plan.
    pub fn summary(&self) -> String {
        if self.warnings.is_empty() {
            self.diff.summary()
        } else {
            format!("{} ({} warnings)", self.diff.summary(), self.warnings.len())
        }
    }
}

/// Result of a migrate or rollback run.
#[derive(Debug, Default)]
pub struct MigrationResult {
    /// Versions applied or reverted, in execution order.
    pub migrations: Vec<String>,
    /// Whether nothing was executed.
    pub dry_run: bool,
    /// Total duration in milliseconds.
    pub duration_ms: i64,
    /// Warnings generated during the run.
    pub warnings: Vec<String>,
}

impl MigrationResult {
    /// Check if any migrations ran.
    pub fn has_changes(&self) -> bool {
        !self.migrations.is_empty() && !self.dry_run
    }

    /// Get a summary of the result.
    pub fn summary(&self, verb: &str) -> String {
        if self.migrations.is_empty() {
            return format!("No migrations {verb}");
        }
        if self.dry_run {
            return format!("[DRY RUN] {} migrations would be {verb}", self.migrations.len());
        }
        format!(
            "{} migrations {verb} in {}ms",
            self.migrations.len(),
            self.duration_ms
        )
    }
}

/// An applied migration whose file changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumMismatch {
    pub version: String,
    /// Checksum recorded when applied.
    pub expected: String,
    /// Checksum of the file on disk.
    pub actual: String,
}

/// Migration status information.
#[derive(Debug)]
pub struct MigrationStatus {
    /// Applied migrations.
    pub applied: Vec<MigrationRecord>,
    /// Pending migrations, ascending.
    pub pending: Vec<MigrationFile>,
    /// Applied migrations edited since.
    pub checksum_mismatches: Vec<ChecksumMismatch>,
    /// Applied versions with no file on disk.
    pub missing: Vec<String>,
}

impl MigrationStatus {
    /// Whether the database is at the latest migration with no drift.
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty() && self.checksum_mismatches.is_empty()
    }
}

/// The main migration engine.
pub struct MigrationEngine<H: MigrationHistoryRepository> {
    config: MigrationConfig,
    history: H,
    file_manager: MigrationFileManager,
}

impl<H: MigrationHistoryRepository> MigrationEngine<H> {
    /// Create a new migration engine.
    pub fn new(config: MigrationConfig, history: H) -> Self {
        let file_manager = MigrationFileManager::new(&config.migrations_dir);
        Self {
            config,
            history,
            file_manager,
        }
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn file_manager(&self) -> &MigrationFileManager {
        &self.file_manager
    }

    /// Create the migrations directory and the ledger table.
    pub async fn initialize(&self) -> MigrateResult<()> {
        self.file_manager.ensure_dir().await?;
        self.history.initialize().await?;
        Ok(())
    }

    /// A differ configured with this engine's policy.
    pub fn differ(&self, current: &Schema, target: &Schema) -> SchemaDiffer {
        SchemaDiffer::new(target.clone())
            .with_current(current.clone())
            .drop_columns(self.config.drop_columns)
    }

    /// Diff, validate, order and generate.
    pub fn plan(&self, current: &Schema, target: &Schema) -> MigrateResult<MigrationPlan> {
        let diff = self.differ(current, target).diff()?;
        self.plan_diff(current, diff)
    }

    /// Validate and generate an already computed diff against `current`.
    pub fn plan_diff(&self, current: &Schema, diff: SchemaDiff) -> MigrateResult<MigrationPlan> {
        if diff.is_empty() {
            return Err(MigrationError::NoChanges);
        }

        Validator::new()
            .with_existing_tables(current.table_names())
            .validate(&diff)?;

        let sql = SqlGenerator::new(self.config.dialect.dialect()).generate(&diff)?;

        let mut warnings = Vec::new();
        if !self.config.allow_data_loss {
            if !diff.tables_to_drop.is_empty() {
                warnings.push(format!(
                    "Would drop {} tables: {}",
                    diff.tables_to_drop.len(),
                    diff.tables_to_drop.join(", ")
                ));
            }
            for table in &diff.tables_to_modify {
                if !table.columns_to_drop.is_empty() {
                    let columns: Vec<&str> =
                        table.columns_to_drop.iter().map(|c| c.name.as_str()).collect();
                    warnings.push(format!(
                        "Would drop columns in '{}': {}",
                        table.name(),
                        columns.join(", ")
                    ));
                }
            }
        }
        if sql.needs_manual_rollback() {
            warnings.push("Down migration needs manual edits before it can run".to_string());
        }

        debug!(summary = %diff.summary(), warnings = warnings.len(), "Planned migration");
        Ok(MigrationPlan {
            diff,
            sql,
            warnings,
        })
    }

    /// Create a new migration file from schema changes.
    pub async fn create_migration(
        &self,
        name: &str,
        current: &Schema,
        target: &Schema,
    ) -> MigrateResult<MigrationFile> {
        let plan = self.plan(current, target)?;
        self.write_plan(name, plan).await
    }

    /// Write a plan as a new migration.
    pub async fn write_plan(&self, name: &str, plan: MigrationPlan) -> MigrateResult<MigrationFile> {
        self.write_sql(name, plan.sql).await
    }

    /// Write a migration with empty `up.sql` and `down.sql` for hand editing.
    pub async fn create_empty_migration(&self, name: &str) -> MigrateResult<MigrationFile> {
        let sql = MigrationSql {
            up: format!("-- {name}: write the forward migration here\n"),
            down: format!("-- {name}: undo the statements in up.sql here\n"),
        };
        self.write_sql(name, sql).await
    }

    async fn write_sql(&self, name: &str, sql: MigrationSql) -> MigrateResult<MigrationFile> {
        let version = self.file_manager.next_version().await?;
        let migration = MigrationFile::new(version, name, sql);
        let path = self.file_manager.write_migration(&migration).await?;
        info!(version = %migration.version, path = %path.display(), "Created migration");
        Ok(migration.with_path(path))
    }

    /// Apply pending migrations in ascending version order.
    ///
    /// Stops at the first failure; migrations applied before it stay applied.
    pub async fn migrate(&self) -> MigrateResult<MigrationResult> {
        let start = Instant::now();
        let status = self.status().await?;

        let mut result = MigrationResult {
            dry_run: self.config.dry_run,
            ..Default::default()
        };

        for mismatch in &status.checksum_mismatches {
            if self.config.fail_on_checksum_mismatch {
                return Err(MigrationError::ChecksumMismatch {
                    version: mismatch.version.clone(),
                    expected: mismatch.expected.clone(),
                    actual: mismatch.actual.clone(),
                });
            }
            result.warnings.push(format!(
                "Migration '{}' has been modified since it was applied",
                mismatch.version
            ));
        }

        for file in status.pending {
            if self.config.dry_run {
                debug!(version = %file.version, "[DRY RUN] Would apply");
                result.migrations.push(file.version);
                continue;
            }

            debug!(version = %file.version, sql = %file.up_sql, "Applying migration");
            self.history.apply(&file).await?;
            info!(version = %file.version, name = %file.name, "Applied migration");
            result.migrations.push(file.version);
        }

        result.duration_ms = start.elapsed().as_millis() as i64;
        Ok(result)
    }

    /// Revert the last `steps` applied migrations, newest first.
    pub async fn rollback(&self, steps: usize) -> MigrateResult<MigrationResult> {
        let start = Instant::now();
        let applied = self.history.get_applied().await?;
        let files: HashMap<String, MigrationFile> = self
            .file_manager
            .list_migrations()
            .await?
            .into_iter()
            .map(|f| (f.version.clone(), f))
            .collect();

        let mut result = MigrationResult {
            dry_run: self.config.dry_run,
            ..Default::default()
        };

        for record in applied.iter().rev().take(steps) {
            let file = files
                .get(&record.version)
                .ok_or_else(|| MigrationError::NotFound(record.version.clone()))?;

            if !file.is_reversible() {
                return Err(MigrationError::migration_file(format!(
                    "Migration '{}' has no runnable down migration; edit {} first",
                    file.version,
                    file.path.join("down.sql").display()
                )));
            }

            if self.config.dry_run {
                debug!(version = %file.version, "[DRY RUN] Would revert");
                result.migrations.push(file.version.clone());
                continue;
            }

            debug!(version = %file.version, sql = %file.down_sql, "Reverting migration");
            self.history.revert(file).await?;
            info!(version = %file.version, "Reverted migration");
            result.migrations.push(file.version.clone());
        }

        result.duration_ms = start.elapsed().as_millis() as i64;
        Ok(result)
    }

    /// Get migration status.
    pub async fn status(&self) -> MigrateResult<MigrationStatus> {
        let applied = self.history.get_applied().await?;
        let files = self.file_manager.list_migrations().await?;

        let recorded: HashMap<&str, &MigrationRecord> =
            applied.iter().map(|r| (r.version.as_str(), r)).collect();

        let mut pending = Vec::new();
        let mut checksum_mismatches = Vec::new();
        for file in &files {
            match recorded.get(file.version.as_str()) {
                None => pending.push(file.clone()),
                Some(record) if record.checksum != file.checksum => {
                    warn!(version = %file.version, "Applied migration was modified");
                    checksum_mismatches.push(ChecksumMismatch {
                        version: file.version.clone(),
                        expected: record.checksum.clone(),
                        actual: file.checksum.clone(),
                    });
                }
                Some(_) => {}
            }
        }

        let missing = applied
            .iter()
            .filter(|r| !files.iter().any(|f| f.version == r.version))
            .map(|r| r.version.clone())
            .collect();

        Ok(MigrationStatus {
            applied,
            pending,
            checksum_mismatches,
            missing,
        })
    }
}
