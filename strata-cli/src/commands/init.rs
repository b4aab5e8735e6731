//! `strata init` command - Initialize a new Strata project.

use std::path::Path;

use crate::cli::InitArgs;
use crate::config::{CONFIG_FILE_NAME, Config, MIGRATIONS_DIR, SCHEMA_FILE_NAME};
use crate::error::CliResult;
use crate::output::{self, success};

/// Example declared schema written by `init`
const EXAMPLE_SCHEMA: &str = r#"# Declared schema. `strata generate <name>` diffs it against the database.

[[tables]]
name = "users"

[[tables.columns]]
name = "id"
type = "int"
primary_key = true
auto_increment = true

[[tables.columns]]
name = "email"
type = "varchar"
size = 255
nullable = false
unique = true

[[tables.columns]]
name = "created_at"
type = "timestamp"
nullable = false
default = "now()"

[[tables]]
name = "posts"

[[tables.columns]]
name = "id"
type = "int"
primary_key = true
auto_increment = true

[[tables.columns]]
name = "user_id"
type = "int"
nullable = false

[[tables.columns]]
name = "title"
type = "varchar"
size = 200
nullable = false

[[tables.columns]]
name = "body"
type = "text"

[[tables.indexes]]
name = "idx_posts_user_id"
columns = ["user_id"]

[[tables.foreign_keys]]
column = "user_id"
referenced_table = "users"
on_delete = "cascade"
"#;

/// Run the init command
pub async fn run(args: InitArgs) -> CliResult<()> {
    output::header("Initialize Strata Project");

    let project_path = args
        .path
        .canonicalize()
        .unwrap_or_else(|_| args.path.clone());

    let config_path = project_path.join(CONFIG_FILE_NAME);
    if config_path.exists() && !args.force {
        output::warn(&format!(
            "Project already initialized. {} exists (use --force to overwrite).",
            CONFIG_FILE_NAME
        ));
        return Ok(());
    }

    output::step(1, 3, "Creating configuration file...");
    std::fs::create_dir_all(&project_path)?;
    let mut config = Config::default();
    config.database.url = args.url;
    config.save(&config_path)?;

    output::step(2, 3, "Creating schema file...");
    let schema_path = project_path.join(SCHEMA_FILE_NAME);
    write_if_missing(&schema_path, EXAMPLE_SCHEMA)?;

    output::step(3, 3, "Creating migrations directory...");
    std::fs::create_dir_all(project_path.join(MIGRATIONS_DIR))?;

    output::newline();
    success("Project initialized successfully!");
    output::newline();

    output::section("Next steps");
    output::list_item(&format!("Edit {} to declare your schema", SCHEMA_FILE_NAME));
    output::list_item("Set DATABASE_URL in your environment or .env");
    output::list_item("Run `strata generate <name>` to create your first migration");
    output::list_item("Run `strata up` to apply it");
    output::newline();

    output::section("Created files");
    output::kv(CONFIG_FILE_NAME, "Strata configuration");
    output::kv(SCHEMA_FILE_NAME, "Declared schema");
    output::kv(&format!("{}/", MIGRATIONS_DIR), "Migration files");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> CliResult<()> {
    if path.exists() {
        output::dim(&format!("  {} exists, leaving it unchanged", path.display()));
        return Ok(());
    }
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_schema::Schema;

    #[test]
    fn test_example_schema_loads() {
        let schema = Schema::from_toml_str(EXAMPLE_SCHEMA).unwrap();
        assert_eq!(schema.len(), 2);

        let posts = schema.get("posts").unwrap();
        assert_eq!(posts.foreign_keys.len(), 1);
        assert_eq!(posts.indexes.len(), 1);
    }
}
