//! Declared schema documents.
//!
//! A document is the on-disk form of a [`Schema`]:
//!
//! ```toml
//! [[tables]]
//! name = "users"
//!
//! [[tables.columns]]
//! name = "id"
//! type = "int"
//! primary_key = true
//! auto_increment = true
//!
//! [[tables.columns]]
//! name = "email"
//! type = "varchar"
//! size = 255
//! unique = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SchemaError, SchemaResult};
use crate::schema::{Schema, Table};

/// Serialized shape of a schema: an ordered list of tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default)]
    pub tables: Vec<Table>,
}

impl TryFrom<SchemaDocument> for Schema {
    type Error = SchemaError;

    fn try_from(doc: SchemaDocument) -> SchemaResult<Self> {
        Schema::from_tables(doc.tables)
    }
}

impl From<Schema> for SchemaDocument {
    fn from(schema: Schema) -> Self {
        Self {
            tables: schema.into_tables(),
        }
    }
}

impl Schema {
    /// Parse a TOML schema document.
    pub fn from_toml_str(content: &str) -> SchemaResult<Self> {
        let doc: SchemaDocument = toml::from_str(content)?;
        Self::try_from(doc)
    }

    /// Parse a JSON schema document.
    pub fn from_json_str(content: &str) -> SchemaResult<Self> {
        let doc: SchemaDocument = serde_json::from_str(content)?;
        Self::try_from(doc)
    }

    /// Load a schema document, choosing the format from the file extension.
    pub fn load(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let schema = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content)?,
            Some("json") => Self::from_json_str(&content)?,
            _ => {
                return Err(SchemaError::UnsupportedFormat {
                    path: path.display().to_string(),
                });
            }
        };

        debug!(path = %path.display(), tables = schema.len(), "Loaded schema document");
        Ok(schema)
    }

    /// Render the schema as a TOML document.
    pub fn to_toml_string(&self) -> SchemaResult<String> {
        let doc = SchemaDocument::from(self.clone());
        toml::to_string_pretty(&doc).map_err(|e| SchemaError::Serialize {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, ForeignKey, ReferentialAction};
    use pretty_assertions::assert_eq;

    const DOC: &str = r#"
[[tables]]
name = "users"

[[tables.columns]]
name = "id"
type = "int"
primary_key = true
auto_increment = true
nullable = false

[[tables.columns]]
name = "email"
type = "varchar"
size = 255
unique = true

[[tables]]
name = "orders"

[[tables.columns]]
name = "id"
type = "int"
primary_key = true
nullable = false

[[tables.columns]]
name = "user_id"
type = "int"
nullable = false

[[tables.indexes]]
name = "idx_orders_user_id"
columns = ["user_id"]

[[tables.foreign_keys]]
column = "user_id"
referenced_table = "users"
on_delete = "set null"
"#;

    #[test]
    fn test_parse_toml_document() {
        let schema = Schema::from_toml_str(DOC).unwrap();
        assert_eq!(schema.len(), 2);

        let users = schema.get("users").unwrap();
        assert_eq!(users.columns.len(), 2);
        assert!(users.columns[1].nullable);
        assert_eq!(users.columns[1].size, Some(255));

        let orders = schema.get("orders").unwrap();
        assert_eq!(orders.indexes[0].columns, vec!["user_id".to_string()]);
        assert_eq!(
            orders.foreign_keys[0],
            ForeignKey::new("user_id", "users").on_delete(ReferentialAction::SetNull)
        );
    }

    #[test]
    fn test_parse_json_document() {
        let json = r#"{"tables":[{"name":"tags","columns":[{"name":"id","type":"uuid","primary_key":true,"nullable":false}]}]}"#;
        let schema = Schema::from_json_str(json).unwrap();
        assert_eq!(schema.get("tags").unwrap().columns[0], Column::new("id", "uuid").primary_key());
    }

    #[test]
    fn test_document_validation_runs() {
        let doc = r#"
[[tables]]
name = "a"
[[tables]]
name = "A"
"#;
        assert!(matches!(
            Schema::from_toml_str(doc),
            Err(SchemaError::DuplicateTable { .. })
        ));
    }

    #[test]
    fn test_toml_round_trip() {
        let schema = Schema::from_toml_str(DOC).unwrap();
        let rendered = schema.to_toml_string().unwrap();
        assert_eq!(Schema::from_toml_str(&rendered).unwrap(), schema);
    }

    #[test]
    fn test_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("schema.toml");
        std::fs::write(&toml_path, DOC).unwrap();
        assert_eq!(Schema::load(&toml_path).unwrap().len(), 2);

        let yaml_path = dir.path().join("schema.yaml");
        std::fs::write(&yaml_path, "tables: []").unwrap();
        assert!(matches!(
            Schema::load(&yaml_path),
            Err(SchemaError::UnsupportedFormat { .. })
        ));

        assert!(matches!(
            Schema::load(dir.path().join("missing.toml")),
            Err(SchemaError::Io { .. })
        ));
    }
}
