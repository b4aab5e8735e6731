//! `strata status` command - Compare migration files with the ledger.

use crate::commands::Project;
use crate::error::CliResult;
use crate::output::{self, MigrationMark, short_checksum, success};

/// Run the status command
pub async fn run() -> CliResult<()> {
    output::header("Migration Status");

    let project = Project::load()?;
    let config = project.migration_config()?;
    output::kv("Migrations", &config.migrations_dir.display().to_string());

    let conn = project.connect().await?;
    let engine = project.pg_engine(conn, config).await?;
    let status = engine.status().await?;
    output::newline();

    output::section(&format!("Applied ({})", status.applied.len()));
    for record in &status.applied {
        output::migration(
            MigrationMark::Applied,
            &format!("{}_{}", record.version, record.name),
        );
    }

    output::newline();
    output::section(&format!("Pending ({})", status.pending.len()));
    for file in &status.pending {
        output::migration(MigrationMark::Pending, &file.dir_name());
    }

    if !status.checksum_mismatches.is_empty() {
        output::newline();
        output::section("Modified after apply");
        for mismatch in &status.checksum_mismatches {
            output::migration(
                MigrationMark::Drifted,
                &format!(
                    "{} (recorded {}, on disk {})",
                    mismatch.version,
                    short_checksum(&mismatch.expected),
                    short_checksum(&mismatch.actual)
                ),
            );
        }
    }

    if !status.missing.is_empty() {
        output::newline();
        output::section("Applied but missing on disk");
        for version in &status.missing {
            output::migration(MigrationMark::Drifted, version);
        }
    }

    output::newline();
    if status.is_up_to_date() {
        success("Database is up to date");
    } else {
        output::warn("Run `strata up` to apply pending migrations");
    }
    Ok(())
}
