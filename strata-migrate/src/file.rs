//! Migration file management.
//!
//! Each migration is a directory `<version>_<name>` holding `up.sql` and
//! `down.sql`. The version is a 14-digit UTC timestamp, so lexical and
//! chronological order agree.

use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{MigrateResult, MigrationError};
use crate::sql::MigrationSql;

const VERSION_FORMAT: &str = "%Y%m%d%H%M%S";
const VERSION_LEN: usize = 14;

/// A migration file on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationFile {
    /// Path to the migration directory. Empty until written or read.
    pub path: PathBuf,
    /// Timestamp version (extracted from the directory name).
    pub version: String,
    /// Migration name (human readable).
    pub name: String,
    /// Up SQL content.
    pub up_sql: String,
    /// Down SQL content.
    pub down_sql: String,
    /// Hex SHA-256 of the up SQL.
    pub checksum: String,
}

impl MigrationFile {
    /// Create a new migration file.
    pub fn new(version: impl Into<String>, name: impl Into<String>, sql: MigrationSql) -> Self {
        let checksum = compute_checksum(&sql.up);

        Self {
            path: PathBuf::new(),
            version: version.into(),
            name: sanitize_name(&name.into()),
            up_sql: sql.up,
            down_sql: sql.down,
            checksum,
        }
    }

    /// Set the path for this migration file.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Directory name: `<version>_<name>`.
    pub fn dir_name(&self) -> String {
        format!("{}_{}", self.version, self.name)
    }

    /// Whether the down SQL can be run as is.
    pub fn is_reversible(&self) -> bool {
        !self.down_sql.trim().is_empty() && !self.down_sql.contains(crate::sql::MANUAL_INTERVENTION)
    }
}

/// Compute the checksum of migration content.
pub fn compute_checksum(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// New migration version from the current UTC time.
pub fn generate_version() -> String {
    Utc::now().format(VERSION_FORMAT).to_string()
}

/// Lowercase `name`, replacing anything outside `[a-z0-9_]` with `_`.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        "migration".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Migration file reader/writer.
#[derive(Debug, Clone)]
pub struct MigrationFileManager {
    /// Directory where migrations are stored.
    migrations_dir: PathBuf,
}

impl MigrationFileManager {
    /// Create a new file manager.
    pub fn new(migrations_dir: impl Into<PathBuf>) -> Self {
        Self {
            migrations_dir: migrations_dir.into(),
        }
    }

    /// Get the migrations directory.
    pub fn migrations_dir(&self) -> &Path {
        &self.migrations_dir
    }

    /// Ensure the migrations directory exists.
    pub async fn ensure_dir(&self) -> MigrateResult<()> {
        tokio::fs::create_dir_all(&self.migrations_dir).await?;
        Ok(())
    }

    /// List all migrations in ascending version order.
    ///
    /// Directories without `up.sql` are ignored. A directory with `up.sql`
    /// but a malformed name is an error.
    pub async fn list_migrations(&self) -> MigrateResult<Vec<MigrationFile>> {
        let mut migrations = Vec::new();

        if !tokio::fs::try_exists(&self.migrations_dir).await? {
            return Ok(migrations);
        }

        let mut entries = tokio::fs::read_dir(&self.migrations_dir).await?;

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if is_migration_dir(&path).await {
                paths.push(path);
            } else if entry.file_type().await?.is_dir() {
                warn!(path = %path.display(), "Ignoring directory without up.sql");
            }
        }

        // Sort by name, which starts with the version
        paths.sort();

        for path in paths {
            migrations.push(self.read_migration(&path).await?);
        }

        debug!(count = migrations.len(), dir = %self.migrations_dir.display(), "Listed migrations");
        Ok(migrations)
    }

    /// Find a migration by version.
    pub async fn find(&self, version: &str) -> MigrateResult<MigrationFile> {
        self.list_migrations()
            .await?
            .into_iter()
            .find(|m| m.version == version)
            .ok_or_else(|| MigrationError::NotFound(version.to_string()))
    }

    /// Read a migration from a directory.
    pub async fn read_migration(&self, path: &Path) -> MigrateResult<MigrationFile> {
        let dir_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                MigrationError::migration_file(format!("Invalid path: {}", path.display()))
            })?;

        let (version, name) = parse_migration_name(dir_name)?;

        let up_sql = tokio::fs::read_to_string(path.join("up.sql")).await?;

        let down_path = path.join("down.sql");
        let down_sql = if tokio::fs::try_exists(&down_path).await? {
            tokio::fs::read_to_string(&down_path).await?
        } else {
            String::new()
        };

        let checksum = compute_checksum(&up_sql);

        Ok(MigrationFile {
            path: path.to_path_buf(),
            version,
            name,
            up_sql,
            down_sql,
            checksum,
        })
    }

    /// Versions of the migration directories present on disk.
    async fn existing_versions(&self) -> MigrateResult<Vec<String>> {
        let mut versions = Vec::new();
        if !tokio::fs::try_exists(&self.migrations_dir).await? {
            return Ok(versions);
        }

        let mut entries = tokio::fs::read_dir(&self.migrations_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let version = file_name
                .to_str()
                .and_then(|n| n.split_once('_'))
                .map(|(version, _)| version)
                .filter(|v| v.len() == VERSION_LEN && v.chars().all(|c| c.is_ascii_digit()));
            if let Some(version) = version {
                versions.push(version.to_string());
            }
        }
        Ok(versions)
    }

    /// Version for a new migration: the current time, or one second after
    /// the newest existing version when that is not earlier.
    pub async fn next_version(&self) -> MigrateResult<String> {
        let now = generate_version();
        let Some(latest) = self.existing_versions().await?.into_iter().max() else {
            return Ok(now);
        };
        if latest < now {
            return Ok(now);
        }

        let bumped = NaiveDateTime::parse_from_str(&latest, VERSION_FORMAT)
            .ok()
            .and_then(|t| t.checked_add_signed(TimeDelta::seconds(1)))
            .ok_or_else(|| {
                MigrationError::migration_file(format!("Cannot order after version {latest}"))
            })?;
        Ok(bumped.format(VERSION_FORMAT).to_string())
    }

    /// Write a migration to disk, returning its directory.
    ///
    /// Fails when a migration with the same version already exists.
    pub async fn write_migration(&self, migration: &MigrationFile) -> MigrateResult<PathBuf> {
        self.ensure_dir().await?;

        let migration_dir = self.migrations_dir.join(migration.dir_name());
        if tokio::fs::try_exists(&migration_dir).await? {
            return Err(MigrationError::migration_file(format!(
                "Migration directory already exists: {}",
                migration_dir.display()
            )));
        }
        if self.existing_versions().await?.contains(&migration.version) {
            return Err(MigrationError::migration_file(format!(
                "Migration version {} is already taken",
                migration.version
            )));
        }

        tokio::fs::create_dir_all(&migration_dir).await?;
        tokio::fs::write(migration_dir.join("up.sql"), &migration.up_sql).await?;
        tokio::fs::write(migration_dir.join("down.sql"), &migration.down_sql).await?;

        debug!(path = %migration_dir.display(), checksum = %migration.checksum, "Wrote migration");
        Ok(migration_dir)
    }
}

/// Check if a path is a migration directory.
async fn is_migration_dir(path: &Path) -> bool {
    // Must have an up.sql file
    tokio::fs::try_exists(path.join("up.sql"))
        .await
        .unwrap_or(false)
}

/// Parse a migration directory name into (version, name).
fn parse_migration_name(dir_name: &str) -> MigrateResult<(String, String)> {
    // Expected format: YYYYMMDDHHMMSS_name
    let (version, name) = dir_name.split_once('_').ok_or_else(|| {
        MigrationError::migration_file(format!("Invalid migration name format: {dir_name}"))
    })?;

    if version.len() != VERSION_LEN || !version.chars().all(|c| c.is_ascii_digit()) {
        return Err(MigrationError::migration_file(format!(
            "Invalid migration version (expected timestamp): {version}"
        )));
    }

    if name.is_empty() {
        return Err(MigrationError::migration_file(format!(
            "Migration {version} has no name"
        )));
    }

    Ok((version.to_string(), name.to_string()))
}
