//! Relation descriptions: the schema-level document every operator derives
//! from its inputs and hands to its consumer.
//!
//! The serialized shape follows the catalog's table documents
//! (`column_definitions`, `unique_columns`, `foreign_key_columns`, ...), so a
//! description can be read straight from, or written straight to, a catalog
//! introspection payload.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Table name carried by computed (not yet materialized) relations. Constraint
/// names generated for such relations embed this token until a mutation
/// operator substitutes the real destination name.
pub const COMPUTED_RELATION_PLACEHOLDER: &str = "{__computed_relation__}";

/// Free-form JSON object used for ACLs, ACL bindings and annotations.
pub type Document = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnType {
    pub typename: String,
}

impl ColumnType {
    pub fn new(typename: impl Into<String>) -> Self {
        Self {
            typename: typename.into(),
        }
    }

    pub fn text() -> Self {
        Self::new("text")
    }

    /// The array type whose elements are of this type.
    pub fn array_of(&self) -> Self {
        Self::new(format!("{}[]", self.typename))
    }

    pub fn is_array(&self) -> bool {
        self.typename.ends_with("[]")
    }
}

fn default_nullok() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default = "default_nullok")]
    pub nullok: bool,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub acls: Document,
    #[serde(default)]
    pub acl_bindings: Document,
    #[serde(default)]
    pub annotations: Document,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullok: true,
            default: None,
            comment: None,
            acls: Document::new(),
            acl_bindings: Document::new(),
            annotations: Document::new(),
        }
    }

    pub fn with_nullok(mut self, nullok: bool) -> Self {
        self.nullok = nullok;
        self
    }
}

/// `[schema_name, constraint_name]` pair identifying a key or foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstraintName(pub String, pub String);

impl ConstraintName {
    pub fn new(schema_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self(schema_name.into(), name.into())
    }

    pub fn schema_name(&self) -> &str {
        &self.0
    }

    pub fn name(&self) -> &str {
        &self.1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDef {
    #[serde(default)]
    pub names: Vec<ConstraintName>,
    pub unique_columns: Vec<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub annotations: Document,
}

impl KeyDef {
    pub fn new(unique_columns: Vec<String>, names: Vec<ConstraintName>) -> Self {
        Self {
            names,
            unique_columns,
            comment: None,
            annotations: Document::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    pub column_name: String,
}

impl ColumnRef {
    pub fn local(column_name: impl Into<String>) -> Self {
        Self {
            schema_name: None,
            table_name: None,
            column_name: column_name.into(),
        }
    }

    pub fn qualified(
        schema_name: impl Into<String>,
        table_name: impl Into<String>,
        column_name: impl Into<String>,
    ) -> Self {
        Self {
            schema_name: Some(schema_name.into()),
            table_name: Some(table_name.into()),
            column_name: column_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FKeyDef {
    #[serde(default)]
    pub names: Vec<ConstraintName>,
    pub foreign_key_columns: Vec<ColumnRef>,
    pub referenced_columns: Vec<ColumnRef>,
    #[serde(default)]
    pub on_update: Option<String>,
    #[serde(default)]
    pub on_delete: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub acls: Document,
    #[serde(default)]
    pub acl_bindings: Document,
    #[serde(default)]
    pub annotations: Document,
}

impl FKeyDef {
    /// Foreign key from `fk_columns` of the described relation to `pk_columns`
    /// of `pk_schema:pk_table`.
    pub fn define(
        fk_columns: &[String],
        pk_schema: &str,
        pk_table: &str,
        pk_columns: &[String],
        on_update: Option<&str>,
        names: Vec<ConstraintName>,
    ) -> Self {
        Self {
            names,
            foreign_key_columns: fk_columns.iter().map(ColumnRef::local).collect(),
            referenced_columns: pk_columns
                .iter()
                .map(|c| ColumnRef::qualified(pk_schema, pk_table, c.as_str()))
                .collect(),
            on_update: on_update.map(|s| s.to_string()),
            on_delete: None,
            comment: None,
            acls: Document::new(),
            acl_bindings: Document::new(),
            annotations: Document::new(),
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.foreign_key_columns
            .iter()
            .map(|c| c.column_name.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDescription {
    #[serde(default)]
    pub schema_name: String,
    pub table_name: String,
    #[serde(default)]
    pub column_definitions: Vec<ColumnDef>,
    #[serde(default)]
    pub keys: Vec<KeyDef>,
    #[serde(default)]
    pub foreign_keys: Vec<FKeyDef>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub acls: Document,
    #[serde(default)]
    pub acl_bindings: Document,
    #[serde(default)]
    pub annotations: Document,
}

impl RelationDescription {
    /// A bare relation with the given columns and no constraints or metadata.
    pub fn new(table_name: impl Into<String>, column_definitions: Vec<ColumnDef>) -> Self {
        Self {
            schema_name: String::new(),
            table_name: table_name.into(),
            column_definitions,
            keys: Vec::new(),
            foreign_keys: Vec::new(),
            comment: None,
            acls: Document::new(),
            acl_bindings: Document::new(),
            annotations: Document::new(),
        }
    }

    /// A computed relation named with the placeholder token.
    pub fn computed(column_definitions: Vec<ColumnDef>) -> Self {
        Self::new(COMPUTED_RELATION_PLACEHOLDER, column_definitions)
    }

    pub fn with_schema_name(mut self, schema_name: impl Into<String>) -> Self {
        self.schema_name = schema_name.into();
        self
    }

    /// Parse a catalog table document.
    pub fn from_json(doc: &str) -> Result<Self> {
        let desc: Self = serde_json::from_str(doc)?;
        desc.validate()?;
        Ok(desc)
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn is_computed(&self) -> bool {
        self.table_name == COMPUTED_RELATION_PLACEHOLDER
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.column_definitions.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.column_definitions
            .iter()
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Check the structural invariants: column names are unique and every
    /// key/foreign-key column names an existing column.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for col in &self.column_definitions {
            if !seen.insert(col.name.as_str()) {
                return Err(Error::Schema(format!(
                    "duplicate column '{}' in relation '{}'",
                    col.name, self.table_name
                )));
            }
        }
        for key in &self.keys {
            if let Some(missing) = key.unique_columns.iter().find(|c| !seen.contains(c.as_str())) {
                return Err(Error::Schema(format!(
                    "key column '{}' not in relation '{}'",
                    missing, self.table_name
                )));
            }
        }
        for fkey in &self.foreign_keys {
            if let Some(missing) = fkey.column_names().into_iter().find(|c| !seen.contains(c)) {
                return Err(Error::Schema(format!(
                    "foreign key column '{}' not in relation '{}'",
                    missing, self.table_name
                )));
            }
        }
        Ok(())
    }
}
