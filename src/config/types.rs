//! Raw registry types matching the JSON column-definition document.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Storage data type of a column. `numeric`, `float` and `real` all map to [`DataType::Numeric`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Int,
    #[serde(alias = "text")]
    String,
    #[serde(alias = "float", alias = "real")]
    Numeric,
    Blob,
}

impl DataType {
    /// SQLite column type used in generated DDL.
    pub fn sql_type(self) -> &'static str {
        match self {
            DataType::Int => "INTEGER",
            DataType::String => "TEXT",
            DataType::Numeric => "REAL",
            DataType::Blob => "BLOB",
        }
    }

    /// Maps a declared SQLite column type to a data type using SQLite's affinity rules.
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.to_uppercase();
        if upper.contains("INT") {
            DataType::Int
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            DataType::String
        } else if upper.contains("BLOB") || upper.is_empty() {
            DataType::Blob
        } else {
            DataType::Numeric
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    pub table: String,
    pub column: String,
}

/// One column of one entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub display_name: String,
    #[serde(rename = "type", default = "default_data_type")]
    pub data_type: DataType,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default, alias = "foreign_key")]
    pub is_foreign_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<ForeignKeyRef>,
    /// Hidden from edit/insert forms and excluded from INSERT/UPDATE.
    #[serde(default, alias = "admin")]
    pub is_admin: bool,
    #[serde(default, alias = "default", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
    /// Regular expression a non-empty text value must match in full.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

fn default_data_type() -> DataType {
    DataType::String
}

impl ColumnDefinition {
    /// Column with only a name and type; everything else defaulted.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        let name = name.into();
        ColumnDefinition {
            display_name: name.clone(),
            name,
            data_type,
            is_primary_key: false,
            is_foreign_key: false,
            references: None,
            is_admin: false,
            default_value: None,
            width: None,
            required: false,
            allowed_values: None,
            pattern: None,
        }
    }
}

/// Columns of one table, in display order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntitySchema {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    /// Column groups no two rows may share. NULLs compare equal.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unique: Vec<Vec<String>>,
}

impl EntitySchema {
    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn primary_key_column(&self) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.is_primary_key)
    }

    pub fn foreign_keys(&self) -> impl Iterator<Item = (&ColumnDefinition, &ForeignKeyRef)> {
        self.columns
            .iter()
            .filter(|c| c.is_foreign_key)
            .filter_map(|c| c.references.as_ref().map(|r| (c, r)))
    }
}

/// Whole registry document as loaded from JSON.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RegistryDocument {
    pub entities: Vec<EntitySchema>,
}
