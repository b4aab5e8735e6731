//! `strata validate` command - Check the declared schema and its diff.

use strata_migrate::{MemoryHistory, MigrationEngine, MigrationError, ValidationError, Validator};

use crate::cli::ValidateArgs;
use crate::commands::Project;
use crate::error::CliResult;
use crate::output::{self, success};

/// Run the validate command
pub async fn run(args: ValidateArgs) -> CliResult<()> {
    output::header("Validate Schema");

    let project = Project::load()?;

    output::step(1, 3, "Loading declared schema...");
    let target = project.declared_schema(args.schema.as_deref())?;
    let stats = target.stats();
    output::kv("Tables", &stats.table_count.to_string());
    output::kv("Columns", &stats.column_count.to_string());
    output::kv("Indexes", &stats.index_count.to_string());
    output::kv("Foreign keys", &stats.foreign_key_count.to_string());

    output::step(2, 3, "Computing diff...");
    let current = project.current_schema(!args.live).await?;
    let engine = MigrationEngine::new(project.migration_config()?, MemoryHistory::new());
    let diff = engine.differ(&current, &target).diff()?;
    output::kv("Changes", &diff.summary());

    output::step(3, 3, "Validating diff...");
    match Validator::new()
        .with_existing_tables(current.table_names())
        .validate(&diff)
    {
        Ok(()) => {}
        Err(ValidationError::NoChanges) => {
            output::newline();
            success("Schema is valid, no changes to validate");
            return Ok(());
        }
        Err(e) => {
            output::kv("Check", e.code());
            return Err(MigrationError::from(e).into());
        }
    }

    output::newline();
    success("Schema is valid");
    Ok(())
}
