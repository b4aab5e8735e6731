//! Logical column types and value normalization.
//!
//! Declared models and live catalogs spell the same type in many ways
//! (`int4`, `integer`, `int64`, `bigint`, ...). Everything that compares
//! columns goes through [`normalize_type`] and [`normalize_default`] so that
//! two spellings of one type never show up as a change.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel produced by [`normalize_default`] for sequence-backed defaults.
pub const AUTO_INCREMENT_DEFAULT: &str = "auto_increment";

/// The comparable type vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalType {
    /// Every integer width, signed or unsigned.
    BigInt,
    /// Floating point and fixed precision numbers.
    Decimal,
    /// Character strings of any length.
    Varchar,
    Boolean,
    /// Dates with a time component, with or without a zone.
    Timestamp,
    Jsonb,
    Uuid,
    /// A spelling outside the known vocabulary, kept lower-cased.
    Other(String),
}

impl LogicalType {
    /// Canonical name of the type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::BigInt => "bigint",
            Self::Decimal => "decimal",
            Self::Varchar => "varchar",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
            Self::Jsonb => "jsonb",
            Self::Uuid => "uuid",
            Self::Other(name) => name,
        }
    }

    /// Whether this type is part of the known vocabulary.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// Whether values of this type are integers.
    pub fn is_integer(&self) -> bool {
        matches!(self, Self::BigInt)
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for LogicalType {
    fn from(raw: &str) -> Self {
        normalize_type(raw)
    }
}

/// Collapse a raw type spelling into its logical type.
///
/// Case and surrounding whitespace are ignored, and any parameter list such
/// as `(255)` or `(10,2)` is dropped before the lookup.
pub fn normalize_type(raw: &str) -> LogicalType {
    let base = base_type_name(raw);
    match base.as_str() {
        "int" | "int2" | "int4" | "int8" | "int16" | "int32" | "int64" | "uint" | "uint8"
        | "uint16" | "uint32" | "uint64" | "integer" | "smallint" | "bigint" | "serial"
        | "smallserial" | "bigserial" => LogicalType::BigInt,
        "float" | "float4" | "float8" | "float32" | "float64" | "real" | "double"
        | "double precision" | "numeric" | "decimal" => LogicalType::Decimal,
        "string" | "varchar" | "text" | "character varying" | "char" | "character"
        | "bpchar" | "citext" => LogicalType::Varchar,
        "bool" | "boolean" => LogicalType::Boolean,
        "time" | "timestamp" | "timestamptz" | "datetime" | "timestamp with time zone"
        | "timestamp without time zone" => LogicalType::Timestamp,
        "json" | "jsonb" => LogicalType::Jsonb,
        "uuid" => LogicalType::Uuid,
        _ => LogicalType::Other(base),
    }
}

/// Whether a raw spelling, bare or parameterized, names a known type.
///
/// Parameters must be one or two integers: `decimal(10,2)` is accepted,
/// `varchar(abc)` is not.
pub fn is_known_type(raw: &str) -> bool {
    let lowered = raw.trim().to_lowercase();
    if lowered.is_empty() || !has_valid_parameters(&lowered) {
        return false;
    }
    normalize_type(&lowered).is_known()
}

/// Normalize a raw default value for comparison.
///
/// Quoting and trailing casts are stripped and the value is lower-cased.
/// Known equivalents are folded:
///
/// | raw                                         | normalized          |
/// |---------------------------------------------|---------------------|
/// | empty, `NULL`, `DEFAULT NULL`               | empty string        |
/// | `nextval('users_id_seq'::regclass)`         | `auto_increment`    |
/// | `0`, `0.0`                                  | `0`                 |
/// | `now()`, `CURRENT_TIMESTAMP`, `current_timestamp()` | `current_timestamp` |
pub fn normalize_default(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    if lowered.starts_with("nextval") {
        return AUTO_INCREMENT_DEFAULT.to_string();
    }

    let uncast = strip_cast(&lowered);
    let value = uncast.trim().trim_matches(|c| c == '\'' || c == '"').trim();

    match value {
        "" | "null" | "default null" => String::new(),
        "true" | "false" => value.to_string(),
        "now()" | "current_timestamp" | "current_timestamp()" => "current_timestamp".to_string(),
        _ if is_zero(value) => "0".to_string(),
        _ => value.to_string(),
    }
}

/// Lower-cased type name with parameter lists removed and whitespace collapsed.
fn base_type_name(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let mut stripped = String::with_capacity(lowered.len());
    let mut depth = 0usize;
    for c in lowered.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => stripped.push(c),
            _ => {}
        }
    }
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Every parenthesized group holds one or two unsigned integers.
fn has_valid_parameters(lowered: &str) -> bool {
    let mut rest = lowered;
    while let Some(open) = rest.find('(') {
        let Some(close) = rest[open..].find(')') else {
            return false;
        };
        let params = &rest[open + 1..open + close];
        let parts: Vec<&str> = params.split(',').map(str::trim).collect();
        if parts.len() > 2
            || parts
                .iter()
                .any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()))
        {
            return false;
        }
        rest = &rest[open + close + 1..];
    }
    !rest.contains(')')
}

/// Remove a trailing `::type` cast such as `'x'::character varying`.
fn strip_cast(value: &str) -> &str {
    match value.rfind("::") {
        Some(idx)
            if value[idx + 2..]
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ' ' | '[' | ']')) =>
        {
            &value[..idx]
        }
        _ => value,
    }
}

fn is_zero(value: &str) -> bool {
    value.chars().all(|c| c.is_ascii_digit() || c == '.')
        && value.parse::<f64>().is_ok_and(|n| n == 0.0)
}
