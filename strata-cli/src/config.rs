//! CLI configuration handling.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use strata_migrate::{DEFAULT_MIGRATIONS_TABLE, DialectKind, MigrationConfig};

use crate::error::{CliError, CliResult};

/// Default config file name (lives in project root)
pub const CONFIG_FILE_NAME: &str = "strata.toml";

/// Default declared schema document (relative to project root)
pub const SCHEMA_FILE_NAME: &str = "schema.toml";

/// Default migrations directory (relative to project root)
pub const MIGRATIONS_DIR: &str = "migrations";

/// Environment file consulted after the process environment
pub const ENV_FILE_NAME: &str = ".env";

/// Environment variable holding the connection URL
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

/// Environment variable overriding the migrations directory
pub const MIGRATIONS_PATH_VAR: &str = "MIGRATIONS_PATH";

/// Strata CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Migration configuration
    pub migrations: MigrationsConfig,

    /// Diff policy
    pub diff: DiffConfig,

    /// Declared schema location
    pub schema: SchemaConfig,
}

/// Database configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL, `${VAR}` references are expanded
    pub url: Option<String>,

    /// Dialect used to render migrations
    pub dialect: DialectKind,
}

/// Migration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationsConfig {
    /// Directory for migration files
    pub directory: String,

    /// Ledger table name
    pub table: String,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            directory: MIGRATIONS_DIR.to_string(),
            table: DEFAULT_MIGRATIONS_TABLE.to_string(),
        }
    }
}

/// Diff policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Drop columns that are no longer declared
    pub drop_columns: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self { drop_columns: true }
    }
}

/// Declared schema location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Path to the schema document, `.toml` or `.json`
    pub path: PathBuf,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(SCHEMA_FILE_NAME),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `strata.toml` from the project root, or defaults when it is absent
    pub fn load_or_default(cwd: &Path) -> CliResult<Self> {
        let path = cwd.join(CONFIG_FILE_NAME);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> CliResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolve the connection URL.
    ///
    /// `DATABASE_URL` from the environment wins, then from `.env`, then the
    /// configured url.
    pub fn database_url(&self, cwd: &Path) -> CliResult<String> {
        let from_env = std::env::var(DATABASE_URL_VAR).ok();
        let from_file = env_file_value(&cwd.join(ENV_FILE_NAME), DATABASE_URL_VAR);
        self.resolve_database_url(from_env, from_file)
    }

    fn resolve_database_url(
        &self,
        from_env: Option<String>,
        from_file: Option<String>,
    ) -> CliResult<String> {
        let configured = self
            .database
            .url
            .as_deref()
            .map(expand_env_vars)
            .filter(|url| !url.contains("${"));

        from_env
            .into_iter()
            .chain(from_file)
            .chain(configured)
            .find(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                CliError::Config("DATABASE_URL not set in environment or .env file".to_string())
            })
    }

    /// Resolve the migrations directory, honoring `MIGRATIONS_PATH`.
    pub fn migrations_dir(&self, cwd: &Path) -> CliResult<PathBuf> {
        let overridden = std::env::var(MIGRATIONS_PATH_VAR)
            .ok()
            .filter(|p| !p.trim().is_empty());
        resolve_inside(
            cwd,
            overridden.as_deref().unwrap_or(&self.migrations.directory),
        )
    }

    /// Path of the declared schema document.
    pub fn schema_path(&self, cwd: &Path) -> PathBuf {
        cwd.join(&self.schema.path)
    }

    /// Engine configuration for this project.
    pub fn migration_config(&self, cwd: &Path) -> CliResult<MigrationConfig> {
        Ok(MigrationConfig::new()
            .migrations_dir(self.migrations_dir(cwd)?)
            .drop_columns(self.diff.drop_columns)
            .dialect(self.database.dialect))
    }
}

/// Join `path` onto `root` and reject results that escape `root`.
fn resolve_inside(root: &Path, path: &str) -> CliResult<PathBuf> {
    let joined = root.join(path);

    let mut resolved = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::ParentDir => {
                if !resolved.pop() {
                    return Err(outside_root(path));
                }
            }
            Component::CurDir => {}
            other => resolved.push(other),
        }
    }

    if resolved.starts_with(root) {
        Ok(resolved)
    } else {
        Err(outside_root(path))
    }
}

fn outside_root(path: &str) -> CliError {
    CliError::Config(format!(
        "migrations directory '{}' must be inside the working directory",
        path
    ))
}

/// Look up `key` in a dotenv file without touching the process environment.
fn env_file_value(path: &Path, key: &str) -> Option<String> {
    dotenvy::from_path_iter(path)
        .ok()?
        .filter_map(Result::ok)
        .find(|(name, _)| name == key)
        .map(|(_, value)| value)
}

/// Expand `${VAR}` references from the environment, leaving unknown ones in place.
fn expand_env_vars(s: &str) -> String {
    let Ok(re) = regex_lite::Regex::new(r"\$\{([^}]+)\}") else {
        return s.to_string();
    };
    re.replace_all(s, |caps: &regex_lite::Captures<'_>| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}
