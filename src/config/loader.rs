//! Load the schema registry from the embedded default document or from a JSON file.

use crate::config::{RegistryDocument, SchemaRegistry};
use crate::error::ConfigError;
use std::path::Path;

const BUILTIN_SCHEMA: &str = include_str!("default_schema.json");

/// Parse a registry document from JSON text.
pub fn parse_document(json: &str) -> Result<RegistryDocument, ConfigError> {
    serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))
}

/// Registry built from the column definitions shipped with the crate.
pub fn load_builtin() -> Result<SchemaRegistry, ConfigError> {
    SchemaRegistry::from_document(parse_document(BUILTIN_SCHEMA)?)
}

/// Registry built from a JSON document on disk.
pub async fn load_from_path(path: &Path) -> Result<SchemaRegistry, ConfigError> {
    tracing::debug!(path = %path.display(), "loading schema registry");
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    SchemaRegistry::from_document(parse_document(&text)?)
}

/// File registry when a path is configured, built-in registry otherwise.
pub async fn load_registry(path: Option<&Path>) -> Result<SchemaRegistry, ConfigError> {
    match path {
        Some(p) => load_from_path(p).await,
        None => load_builtin(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_document_defines_all_entities() {
        let reg = load_builtin().unwrap();
        let names: Vec<_> = reg.entity_names().collect();
        assert_eq!(
            names,
            vec!["Assemblies", "Parts", "Suppliers", "Drawings", "Images", "Assemblies_Parts"]
        );
        for schema in reg.entities() {
            assert!(schema.primary_key().is_ok(), "{}", schema.name);
        }
    }

    #[test]
    fn malformed_json_is_a_load_error() {
        assert!(matches!(parse_document("{ not json"), Err(ConfigError::Load(_))));
    }

    #[tokio::test]
    async fn loads_registry_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");
        std::fs::write(
            &path,
            r#"{"entities":[{"name":"Widgets","columns":[
                {"name":"WidgetID","display_name":"ID","type":"int","is_primary_key":true},
                {"name":"Label","display_name":"Label","type":"string"}
            ]}]}"#,
        )
        .unwrap();
        let reg = load_registry(Some(&path)).await.unwrap();
        assert_eq!(reg.primary_key("Widgets").unwrap().name, "WidgetID");
    }

    #[tokio::test]
    async fn missing_file_is_a_load_error() {
        let err = load_from_path(Path::new("/nonexistent/schema.json")).await.unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }
}
