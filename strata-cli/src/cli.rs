//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Strata CLI - schema migrations from declared schemas
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(author = "Pegasus Heavy Industries LLC")]
#[command(version)]
#[command(about = "Strata CLI - schema migrations from declared schemas", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a new Strata project
    Init(InitArgs),

    /// Show the pending schema diff and its SQL without writing anything
    Diff(DiffArgs),

    /// Generate a migration from the declared schema
    Generate(GenerateArgs),

    /// Create an empty migration to write by hand
    Create(CreateArgs),

    /// Run schema and diff validation
    Validate(ValidateArgs),

    /// Apply pending migrations
    Up(UpArgs),

    /// Revert applied migrations
    Down(DownArgs),

    /// Show applied, pending and drifted migrations
    Status,

    /// List applied migrations
    History,
}

// =============================================================================
// Init Command
// =============================================================================

/// Arguments for the `init` command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path to initialize the project (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Database connection URL to store in strata.toml
    #[arg(short, long)]
    pub url: Option<String>,

    /// Overwrite an existing strata.toml
    #[arg(short, long)]
    pub force: bool,
}

// =============================================================================
// Diff Command
// =============================================================================

/// Arguments for the `diff` command
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Path to schema file
    #[arg(short, long)]
    pub schema: Option<PathBuf>,

    /// Diff against an empty schema instead of the database
    #[arg(long)]
    pub from_empty: bool,
}

// =============================================================================
// Generate Command
// =============================================================================

/// Arguments for the `generate` command
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Migration name, e.g. `create_users`
    pub name: String,

    /// Path to schema file
    #[arg(short, long)]
    pub schema: Option<PathBuf>,

    /// Diff against an empty schema instead of the database
    #[arg(long)]
    pub from_empty: bool,

    /// Rename a table instead of dropping and recreating it (`old:new`)
    #[arg(long = "rename-table", value_name = "OLD:NEW")]
    pub rename_tables: Vec<String>,

    /// Rename a column instead of dropping and adding it (`table.old:new`)
    #[arg(long = "rename-column", value_name = "TABLE.OLD:NEW")]
    pub rename_columns: Vec<String>,
}

// =============================================================================
// Create Command
// =============================================================================

/// Arguments for the `create` command
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Migration name, e.g. `backfill_emails`
    pub name: String,
}

// =============================================================================
// Validate Command
// =============================================================================

/// Arguments for the `validate` command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to schema file
    #[arg(short, long)]
    pub schema: Option<PathBuf>,

    /// Validate the diff against the database instead of an empty schema
    #[arg(long)]
    pub live: bool,
}

// =============================================================================
// Up / Down Commands
// =============================================================================

/// Arguments for the `up` command
#[derive(Args, Debug)]
pub struct UpArgs {
    /// List the migrations that would run without applying them
    #[arg(long)]
    pub dry_run: bool,

    /// Apply even if an applied migration was edited afterwards
    #[arg(long)]
    pub ignore_checksums: bool,
}

/// Arguments for the `down` command
#[derive(Args, Debug)]
pub struct DownArgs {
    /// Number of migrations to revert, newest first
    #[arg(short = 'n', long, default_value_t = 1)]
    pub steps: usize,

    /// List the migrations that would be reverted without running them
    #[arg(long)]
    pub dry_run: bool,
}
