//! `strata up` and `strata down` commands - Apply and revert migrations.

use crate::cli::{DownArgs, UpArgs};
use crate::commands::Project;
use crate::error::CliResult;
use crate::output::{self, MigrationMark, success};

/// Run `strata up`
pub async fn run_up(args: UpArgs) -> CliResult<()> {
    output::header("Migrate Up");

    let project = Project::load()?;
    let config = project
        .migration_config()?
        .dry_run(args.dry_run)
        .fail_on_checksum_mismatch(!args.ignore_checksums);
    output::kv("Migrations", &config.migrations_dir.display().to_string());

    let conn = project.connect().await?;
    let engine = project.pg_engine(conn, config).await?;
    output::newline();

    let result = engine.migrate().await?;
    for warning in &result.warnings {
        output::warn(warning);
    }
    let mark = if args.dry_run {
        MigrationMark::Pending
    } else {
        MigrationMark::Applied
    };
    for version in &result.migrations {
        output::migration(mark, version);
    }

    output::newline();
    if result.migrations.is_empty() {
        success("Database is up to date");
    } else {
        success(&result.summary("applied"));
    }
    Ok(())
}

/// Run `strata down`
pub async fn run_down(args: DownArgs) -> CliResult<()> {
    output::header("Migrate Down");

    let project = Project::load()?;
    let config = project.migration_config()?.dry_run(args.dry_run);
    output::kv("Steps", &args.steps.to_string());

    let conn = project.connect().await?;
    let engine = project.pg_engine(conn, config).await?;
    output::newline();

    let result = engine.rollback(args.steps).await?;
    for version in &result.migrations {
        output::migration(MigrationMark::Pending, version);
    }

    output::newline();
    success(&result.summary("reverted"));
    Ok(())
}
