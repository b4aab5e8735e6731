//! # strata-migrate
//!
//! Migration engine for Strata.
//!
//! This crate provides functionality for:
//! - Schema diffing between a declared schema and the live database state
//! - Foreign-key dependency ordering of created and dropped tables
//! - Validation of a diff before any SQL is produced
//! - Up and down SQL generation for PostgreSQL and SQLite
//! - Migration file management on the filesystem
//! - Migration history tracking and transactional application
//!
//! ## Architecture
//!
//! The diff, resolve, validate and SQL stages are pure and synchronous. Only
//! introspection and history touch the database, through the
//! [`Introspector`] and [`MigrationHistoryRepository`] traits.
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌─────────────┐
//! │ Declared     │────▶│ Schema Differ  │────▶│ Validator   │
//! └──────────────┘     └────────────────┘     └─────────────┘
//!        ┌───────────────────┘                      │
//! ┌──────────────┐                                  ▼
//! │ Introspector │                           ┌─────────────┐
//! └──────────────┘                           │ Topo Sort   │
//!                                            └─────────────┘
//!                                                   │
//!                                                   ▼
//! ┌──────────────┐     ┌────────────────┐     ┌─────────────┐
//! │ History Tbl  │◀────│ Apply SQL      │◀────│ SQL Gen     │
//! └──────────────┘     └────────────────┘     └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use strata_migrate::{SchemaDiffer, SqlGenerator, validate};
//! use strata_schema::{Column, ForeignKey, Schema, Table};
//!
//! let target = Schema::from_tables([
//!     Table::new("users").column(Column::new("id", "int").primary_key().auto_increment()),
//!     Table::new("orders")
//!         .column(Column::new("id", "int").primary_key().auto_increment())
//!         .column(Column::new("user_id", "int"))
//!         .foreign_key(ForeignKey::new("user_id", "users")),
//! ])
//! .unwrap();
//!
//! let diff = SchemaDiffer::new(target).diff().unwrap();
//! validate(&diff).unwrap();
//!
//! let sql = SqlGenerator::postgres().generate(&diff).unwrap();
//! assert!(sql.up.contains("REFERENCES \"users\"(id) ON DELETE CASCADE"));
//! assert!(sql.down.ends_with("DROP TABLE IF EXISTS \"users\";"));
//! ```
//!
//! ## Migration Files
//!
//! Migrations are stored as directories with `up.sql` and `down.sql` files:
//!
//! ```text
//! migrations/
//! ├── 20231215120000_create_users/
//! │   ├── up.sql
//! │   └── down.sql
//! └── 20231216090000_add_posts/
//!     ├── up.sql
//!     └── down.sql
//! ```

pub mod dialect;
pub mod diff;
pub mod engine;
pub mod error;
pub mod file;
pub mod history;
pub mod introspect;
pub mod resolve;
pub mod sql;
pub mod validate;

// Re-exports
pub use dialect::{Dialect, DialectKind, Postgres, Sqlite};
pub use diff::{
    Change, ColumnChange, Rename, SchemaDiff, SchemaDiffer, TableDiff, columns_equal, diff_schemas,
};
pub use engine::{
    ChecksumMismatch, MigrationConfig, MigrationEngine, MigrationPlan, MigrationResult,
    MigrationStatus,
};
pub use error::{MigrateResult, MigrationError};
pub use file::{MigrationFile, MigrationFileManager, compute_checksum};
pub use history::{MemoryHistory, MigrationHistoryRepository, MigrationRecord, postgres_init_sql};
pub use introspect::{
    DEFAULT_MIGRATIONS_TABLE, IntrospectionConfig, Introspector, introspect_schema,
};
pub use resolve::{Dependent, reverse_order, topo_sort};
pub use sql::{MANUAL_INTERVENTION, MigrationSql, SqlGenerator};
pub use validate::{ValidationError, Validator, validate};
