//! CLI command implementations.

pub mod create;
pub mod diff;
pub mod generate;
pub mod history;
pub mod init;
pub mod migrate;
pub mod status;
pub mod validate;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use strata_migrate::{
    IntrospectionConfig, MigrationConfig, MigrationEngine, MigrationPlan, introspect_schema,
};
use strata_postgres::{PgConfig, PgConnection, PgIntrospector, PgMigrationStore};
use strata_schema::Schema;
use tracing::debug;

use crate::config::Config;
use crate::error::CliResult;
use crate::output;

/// The project in the working directory: its root and `strata.toml`.
pub struct Project {
    pub root: PathBuf,
    pub config: Config,
}

impl Project {
    /// Load the project rooted at the current directory.
    pub fn load() -> CliResult<Self> {
        let root = std::env::current_dir()?;
        let config = Config::load_or_default(&root)?;
        debug!(root = %root.display(), "Loaded project configuration");
        Ok(Self { root, config })
    }

    /// Load the declared target schema.
    pub fn declared_schema(&self, path: Option<&Path>) -> CliResult<Schema> {
        let path = match path {
            Some(path) => self.root.join(path),
            None => self.config.schema_path(&self.root),
        };
        Ok(Schema::load(&path)?)
    }

    /// Engine configuration for this project.
    pub fn migration_config(&self) -> CliResult<MigrationConfig> {
        self.config.migration_config(&self.root)
    }

    /// Connect to the configured database.
    pub async fn connect(&self) -> CliResult<Arc<PgConnection>> {
        let url = self.config.database_url(&self.root)?;
        let pg_config = PgConfig::from_url(url)?;
        output::kv("Database", &pg_config.redacted_url());
        Ok(Arc::new(PgConnection::connect(&pg_config).await?))
    }

    /// Read the live schema, skipping the migration ledger.
    pub async fn live_schema(&self, conn: &Arc<PgConnection>) -> CliResult<Schema> {
        let config = IntrospectionConfig::new().exclude_table(&self.config.migrations.table);
        let schema = introspect_schema(&PgIntrospector::new(conn.clone()), &config).await?;
        debug!(tables = schema.len(), "Introspected live schema");
        Ok(schema)
    }

    /// The schema to diff from: empty, or read from the database.
    pub async fn current_schema(&self, from_empty: bool) -> CliResult<Schema> {
        if from_empty {
            output::kv("Current", "empty schema");
            return Ok(Schema::new());
        }
        let conn = self.connect().await?;
        self.live_schema(&conn).await
    }

    /// Migration engine recording history in the database.
    pub async fn pg_engine(
        &self,
        conn: Arc<PgConnection>,
        config: MigrationConfig,
    ) -> CliResult<MigrationEngine<PgMigrationStore>> {
        let store = PgMigrationStore::with_table(conn, &self.config.migrations.table);
        let engine = MigrationEngine::new(config, store);
        engine.initialize().await?;
        Ok(engine)
    }
}

/// Print a plan's summary, warnings and SQL.
pub fn print_plan(plan: &MigrationPlan) {
    output::kv("Changes", &plan.summary());
    for warning in &plan.warnings {
        output::warn(warning);
    }

    output::newline();
    output::sql_block("Up", &plan.sql.up);
    output::sql_block("Down", &plan.sql.down);
}
