//! `strata history` command - List applied migrations.

use strata_migrate::MigrationHistoryRepository;

use crate::commands::Project;
use crate::error::CliResult;
use crate::output::{self, success};

/// Run the history command
pub async fn run() -> CliResult<()> {
    output::header("Migration History");

    let project = Project::load()?;
    let conn = project.connect().await?;
    let engine = project.pg_engine(conn, project.migration_config()?).await?;
    output::newline();

    let applied = engine.history().get_applied().await?;
    if applied.is_empty() {
        output::info("No migrations have been applied");
        return Ok(());
    }

    for record in applied.iter().rev() {
        output::kv(
            &record.version,
            &format!(
                "{}  {}",
                record.name,
                record.applied_at.format("%Y-%m-%d %H:%M:%S UTC")
            ),
        );
    }

    output::newline();
    success(&format!("{} migrations applied", applied.len()));
    Ok(())
}
