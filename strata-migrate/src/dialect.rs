//! SQL dialects.
//!
//! The differ and the generator work on canonical schemas only. A [`Dialect`]
//! supplies what differs per database: identifier quoting, type names, and
//! which `ALTER TABLE` forms exist.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strata_schema::{Column, LogicalType};

/// Rendering rules for one database.
pub trait Dialect: Send + Sync {
    /// Short lower-case name, e.g. `postgres`.
    fn name(&self) -> &'static str;

    /// Quote an identifier unconditionally.
    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    /// Quote an identifier only when it is not a plain lower-case name or is reserved.
    fn quote_if_needed(&self, ident: &str) -> String {
        if is_plain_identifier(ident) && !is_reserved(ident) {
            ident.to_string()
        } else {
            self.quote_ident(ident)
        }
    }

    /// Full SQL type for a column, including auto-increment types.
    fn column_type(&self, column: &Column) -> String;

    /// Type of the stored values, without auto-increment pseudo-types.
    /// Used where only a real type is accepted, e.g. `ALTER COLUMN ... TYPE`.
    fn storage_type(&self, column: &Column) -> String {
        self.column_type(column)
    }

    /// Keywords placed after `NOT NULL` for a primary key column.
    fn primary_key_clause(&self, column: &Column) -> String {
        let _ = column;
        "PRIMARY KEY".to_string()
    }

    /// Whether `ALTER TABLE ... ALTER COLUMN` is available.
    fn supports_alter_column(&self) -> bool;

    /// Whether constraints can be added to or dropped from existing tables.
    fn supports_alter_constraints(&self) -> bool;

    /// Whether `DROP TABLE ... CASCADE` is available.
    fn supports_drop_cascade(&self) -> bool;
}

/// PostgreSQL.
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn column_type(&self, column: &Column) -> String {
        if column.logical_type().is_integer() && (column.primary_key || column.auto_increment) {
            return if is_wide_integer(&split_type(&column.data_type).0) {
                "BIGSERIAL".to_string()
            } else {
                "SERIAL".to_string()
            };
        }
        self.storage_type(column)
    }

    fn storage_type(&self, column: &Column) -> String {
        let (base, params) = split_type(&column.data_type);

        match column.logical_type() {
            LogicalType::BigInt => match base.as_str() {
                "smallint" | "int2" | "int16" | "smallserial" => "smallint".to_string(),
                _ if is_wide_integer(&base) => "bigint".to_string(),
                _ => "integer".to_string(),
            },
            LogicalType::Decimal => match base.as_str() {
                "float" | "float8" | "float64" | "double" | "double precision" => {
                    "double precision".to_string()
                }
                "float4" | "float32" | "real" => "real".to_string(),
                _ => with_precision("decimal", column, params.as_deref()),
            },
            LogicalType::Varchar => match base.as_str() {
                "text" | "citext" => base.clone(),
                "char" | "character" | "bpchar" => with_size("char", column, params.as_deref(), 1),
                _ => with_size("varchar", column, params.as_deref(), 255),
            },
            LogicalType::Boolean => "boolean".to_string(),
            LogicalType::Timestamp => match base.as_str() {
                "timestamptz" | "timestamp with time zone" => "timestamptz".to_string(),
                _ => "timestamp".to_string(),
            },
            LogicalType::Jsonb => "jsonb".to_string(),
            LogicalType::Uuid => "uuid".to_string(),
            LogicalType::Other(_) => column.data_type.trim().to_string(),
        }
    }

    fn supports_alter_column(&self) -> bool {
        true
    }

    fn supports_alter_constraints(&self) -> bool {
        true
    }

    fn supports_drop_cascade(&self) -> bool {
        true
    }
}

/// SQLite.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl Dialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn column_type(&self, column: &Column) -> String {
        match column.logical_type() {
            // SQLite only auto-increments INTEGER PRIMARY KEY
            LogicalType::BigInt | LogicalType::Boolean => "INTEGER".to_string(),
            LogicalType::Decimal => match split_type(&column.data_type).0.as_str() {
                "numeric" | "decimal" => "NUMERIC".to_string(),
                _ => "REAL".to_string(),
            },
            LogicalType::Varchar
            | LogicalType::Timestamp
            | LogicalType::Jsonb
            | LogicalType::Uuid => "TEXT".to_string(),
            LogicalType::Other(_) => column.data_type.trim().to_string(),
        }
    }

    fn primary_key_clause(&self, column: &Column) -> String {
        if column.auto_increment && column.logical_type().is_integer() {
            "PRIMARY KEY AUTOINCREMENT".to_string()
        } else {
            "PRIMARY KEY".to_string()
        }
    }

    fn supports_alter_column(&self) -> bool {
        false
    }

    fn supports_alter_constraints(&self) -> bool {
        false
    }

    fn supports_drop_cascade(&self) -> bool {
        false
    }
}

/// Dialect selector used in configuration files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    #[default]
    #[serde(alias = "postgresql")]
    Postgres,
    Sqlite,
}

impl DialectKind {
    /// The rendering rules for this dialect.
    pub fn dialect(&self) -> &'static dyn Dialect {
        match self {
            Self::Postgres => &Postgres,
            Self::Sqlite => &Sqlite,
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dialect().name())
    }
}

impl FromStr for DialectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(format!("unknown dialect '{other}'")),
        }
    }
}

/// Split `varchar(255)` into `("varchar", Some("255"))`. The base is lower-cased.
fn split_type(raw: &str) -> (String, Option<String>) {
    let lowered = raw.trim().to_lowercase();
    match (lowered.find('('), lowered.rfind(')')) {
        (Some(open), Some(close)) if close > open => {
            let params: String = lowered[open + 1..close].split_whitespace().collect();
            let base = format!("{} {}", &lowered[..open], &lowered[close + 1..]);
            (
                base.split_whitespace().collect::<Vec<_>>().join(" "),
                Some(params),
            )
        }
        _ => (lowered, None),
    }
}

fn is_wide_integer(base: &str) -> bool {
    matches!(
        base,
        "bigint" | "int8" | "int64" | "uint" | "uint32" | "uint64" | "bigserial"
    )
}

fn with_size(name: &str, column: &Column, params: Option<&str>, fallback: u32) -> String {
    match (column.size, params) {
        (Some(size), _) => format!("{name}({size})"),
        (None, Some(p)) => format!("{name}({p})"),
        (None, None) => format!("{name}({fallback})"),
    }
}

fn with_precision(name: &str, column: &Column, params: Option<&str>) -> String {
    match (column.precision, column.scale, params) {
        (Some(p), Some(s), _) => format!("{name}({p},{s})"),
        (Some(p), None, _) => format!("{name}({p})"),
        (None, _, Some(params)) => format!("{name}({params})"),
        _ => name.to_string(),
    }
}

fn is_plain_identifier(ident: &str) -> bool {
    let mut chars = ident.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn is_reserved(ident: &str) -> bool {
    const RESERVED: &[&str] = &[
        "all", "and", "as", "asc", "by", "case", "check", "column", "constraint", "create",
        "default", "desc", "distinct", "drop", "else", "end", "foreign", "from", "group",
        "having", "in", "index", "is", "key", "limit", "not", "null", "on", "or", "order",
        "primary", "references", "select", "table", "then", "to", "union", "unique", "user",
        "using", "when", "where", "with",
    ];
    RESERVED.contains(&ident)
}
