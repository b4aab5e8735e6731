//! `strata create` command - Write an empty migration for hand-written SQL.

use strata_migrate::{MemoryHistory, MigrationEngine};

use crate::cli::CreateArgs;
use crate::commands::Project;
use crate::error::CliResult;
use crate::output::{self, success};

/// Run the create command
pub async fn run(args: CreateArgs) -> CliResult<()> {
    output::header("Create Migration");

    let project = Project::load()?;
    let engine = MigrationEngine::new(project.migration_config()?, MemoryHistory::new());
    let migration = engine.create_empty_migration(&args.name).await?;

    success(&format!("Migration '{}' created", migration.dir_name()));
    output::kv("Path", &migration.path.display().to_string());
    output::info("Edit up.sql and down.sql, then run `strata up`");

    Ok(())
}
