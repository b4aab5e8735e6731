//! # Strata
//!
//! A schema migration generator: compare a declared schema with the live
//! database, order the changes by foreign keys, and emit reversible SQL.
//!
//! Strata provides:
//! - A canonical, dialect-independent schema model with type normalization
//! - A differ that only reports changes that matter after normalization
//! - Validation of every diff before SQL is generated
//! - Up and down migrations whose table order honors foreign keys
//! - Migration files, a history ledger and transactional application
//!
//! ## Quick Start
//!
//! ```rust
//! use strata::prelude::*;
//!
//! let current = Schema::from_tables([
//!     Table::new("users").column(Column::new("id", "int").primary_key().auto_increment()),
//! ])
//! .unwrap();
//!
//! let target = Schema::from_tables([
//!     Table::new("users")
//!         .column(Column::new("id", "int").primary_key().auto_increment())
//!         .column(Column::new("email", "varchar").size(255).not_null()),
//!     Table::new("posts")
//!         .column(Column::new("id", "int").primary_key().auto_increment())
//!         .column(Column::new("user_id", "int").not_null())
//!         .foreign_key(ForeignKey::new("user_id", "users")),
//! ])
//! .unwrap();
//!
//! let diff = diff_schemas(&current, &target).unwrap();
//! Validator::new()
//!     .with_existing_tables(current.table_names())
//!     .validate(&diff)
//!     .unwrap();
//!
//! let sql = SqlGenerator::postgres().generate(&diff).unwrap();
//! assert!(sql.up.contains("ALTER TABLE \"users\" ADD COLUMN \"email\" varchar(255) NOT NULL;"));
//! assert!(sql.down.contains("DROP TABLE IF EXISTS \"posts\";"));
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Canonical schema model, type normalization and schema documents.
pub mod schema {
    pub use strata_schema::*;
}

/// Diffing, ordering, validation, SQL generation and the migration engine.
pub mod migrate {
    pub use strata_migrate::*;
}

/// PostgreSQL introspection and migration history.
#[cfg(feature = "postgres")]
#[cfg_attr(docsrs, doc(cfg(feature = "postgres")))]
pub mod postgres {
    pub use strata_postgres::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::migrate::{
        MigrationConfig, MigrationEngine, MigrationError, SchemaDiff, SchemaDiffer, SqlGenerator,
        Validator, diff_schemas, topo_sort,
    };
    pub use crate::schema::{Column, ForeignKey, Index, ReferentialAction, Schema, Table};
}

// Re-export key types at the crate root
pub use migrate::{MigrateResult, MigrationError};
pub use schema::{Schema, SchemaError};
