//! # strata-schema
//!
//! Canonical schema model for the Strata migration generator.
//!
//! This crate provides:
//! - Dialect-independent types for tables, columns, indexes and foreign keys
//! - Type and default-value normalization used to decide whether two column
//!   definitions actually differ
//! - Loading declared schemas from TOML or JSON documents
//!
//! ## Example
//!
//! ```rust
//! use strata_schema::{Column, ForeignKey, Schema, Table};
//!
//! let schema = Schema::from_tables([
//!     Table::new("users")
//!         .column(Column::new("id", "int").primary_key().auto_increment())
//!         .column(Column::new("email", "varchar").size(255).unique()),
//!     Table::new("orders")
//!         .column(Column::new("id", "int").primary_key().auto_increment())
//!         .column(Column::new("user_id", "int").not_null())
//!         .foreign_key(ForeignKey::new("user_id", "users")),
//! ])
//! .unwrap();
//!
//! assert_eq!(schema.len(), 2);
//! assert!(schema.get("USERS").is_some());
//! ```

pub mod document;
pub mod error;
pub mod schema;
pub mod types;

pub use document::SchemaDocument;
pub use error::{SchemaError, SchemaResult};
pub use schema::{Column, ForeignKey, Index, ReferentialAction, Schema, SchemaStats, Table};
pub use types::{
    AUTO_INCREMENT_DEFAULT, LogicalType, is_known_type, normalize_default, normalize_type,
};
