//! `strata diff` command - Preview the migration for the declared schema.

use strata_migrate::{MemoryHistory, MigrationEngine, MigrationError};

use crate::cli::DiffArgs;
use crate::commands::{Project, print_plan};
use crate::error::CliResult;
use crate::output::{self, success};

/// Run the diff command
pub async fn run(args: DiffArgs) -> CliResult<()> {
    output::header("Schema Diff");

    let project = Project::load()?;
    let target = project.declared_schema(args.schema.as_deref())?;
    let current = project.current_schema(args.from_empty).await?;

    // Planning never reads history
    let engine = MigrationEngine::new(project.migration_config()?, MemoryHistory::new());
    match engine.plan(&current, &target) {
        Ok(plan) => {
            print_plan(&plan);
            output::dim("Dry run: nothing was written.");
            Ok(())
        }
        Err(MigrationError::NoChanges) => {
            success("Database matches the declared schema");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
