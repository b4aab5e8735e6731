//! `strata generate` command - Write a migration from the declared schema.

use strata_migrate::{MemoryHistory, MigrationEngine, MigrationError, SchemaDiffer};

use crate::cli::GenerateArgs;
use crate::commands::{Project, print_plan};
use crate::error::{CliError, CliResult};
use crate::output::{self, success};

/// Run the generate command
pub async fn run(args: GenerateArgs) -> CliResult<()> {
    output::header("Generate Migration");

    let project = Project::load()?;
    let target = project.declared_schema(args.schema.as_deref())?;

    output::step(1, 3, "Reading current schema...");
    let current = project.current_schema(args.from_empty).await?;

    output::step(2, 3, "Planning migration...");
    // Writing files never touches the ledger
    let engine = MigrationEngine::new(project.migration_config()?, MemoryHistory::new());
    let differ = apply_renames(
        engine.differ(&current, &target),
        &args.rename_tables,
        &args.rename_columns,
    )?;

    let plan = match differ.diff().and_then(|diff| engine.plan_diff(&current, diff)) {
        Ok(plan) => plan,
        Err(MigrationError::NoChanges) => {
            success("No schema changes detected, nothing to generate");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    print_plan(&plan);

    output::step(3, 3, "Writing migration...");
    let migration = engine.write_plan(&args.name, plan).await?;

    output::newline();
    success(&format!("Migration '{}' created", migration.dir_name()));
    output::kv("Path", &migration.path.display().to_string());
    if !migration.is_reversible() {
        output::warn("down.sql needs manual edits before `strata down` can revert it");
    }

    Ok(())
}

/// Register `old:new` table renames and `table.old:new` column renames.
fn apply_renames(
    mut differ: SchemaDiffer,
    tables: &[String],
    columns: &[String],
) -> CliResult<SchemaDiffer> {
    for pair in tables {
        let (from, to) = split_pair(pair)?;
        differ = differ.rename_table(from, to);
    }

    for pair in columns {
        let (qualified, to) = split_pair(pair)?;
        let (table, from) = qualified
            .split_once('.')
            .filter(|(t, c)| !t.is_empty() && !c.is_empty())
            .ok_or_else(|| invalid_rename(pair))?;
        differ = differ.rename_column(table, from, to);
    }

    Ok(differ)
}

fn split_pair(pair: &str) -> CliResult<(&str, &str)> {
    pair.split_once(':')
        .map(|(from, to)| (from.trim(), to.trim()))
        .filter(|(from, to)| !from.is_empty() && !to.is_empty())
        .ok_or_else(|| invalid_rename(pair))
}

fn invalid_rename(pair: &str) -> CliError {
    CliError::Command(format!("invalid rename '{}'", pair))
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_schema::{Column, Schema, Table};

    fn schema(table: &str, column: &str) -> Schema {
        Schema::from_tables([Table::new(table)
            .column(Column::new("id", "int").primary_key())
            .column(Column::new(column, "text"))])
        .unwrap()
    }

    #[test]
    fn test_split_pair() {
        assert_eq!(split_pair("users:accounts").unwrap(), ("users", "accounts"));
        assert!(split_pair("users").is_err());
        assert!(split_pair(":accounts").is_err());
    }

    #[test]
    fn test_apply_renames() {
        let current = schema("users", "name");
        let target = schema("accounts", "full_name");

        let differ = apply_renames(
            SchemaDiffer::new(target).with_current(current),
            &["users:accounts".to_string()],
            &["accounts.name:full_name".to_string()],
        )
        .unwrap();
        let diff = differ.diff().unwrap();

        assert_eq!(diff.tables_to_rename.len(), 1);
        assert!(diff.tables_to_create.is_empty());
        assert!(diff.tables_to_drop.is_empty());
        assert_eq!(diff.tables_to_modify.len(), 1);
        assert_eq!(diff.tables_to_modify[0].columns_to_rename.len(), 1);
    }

    #[test]
    fn test_column_rename_needs_table() {
        let err = apply_renames(
            SchemaDiffer::new(Schema::new()),
            &[],
            &["name:full_name".to_string()],
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Command error: invalid rename 'name:full_name'");
    }
}
