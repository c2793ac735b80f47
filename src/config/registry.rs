//! Schema registry: validated entity schemas flattened for runtime lookups.

use crate::config::validator::{validate, validate_entity};
use crate::config::{ColumnDefinition, DataType, EntitySchema, RegistryDocument};
use crate::error::ConfigError;
use std::collections::HashMap;
use std::sync::Arc;

impl EntitySchema {
    /// Columns to show in a table or form. The primary key is kept even when admin columns are hidden.
    pub fn visible_columns(&self, include_admin: bool) -> Vec<&ColumnDefinition> {
        self.columns
            .iter()
            .filter(|c| include_admin || c.is_primary_key || !c.is_admin)
            .collect()
    }

    /// Form field list: everything a user may type into.
    pub fn editable_columns(&self) -> Vec<&ColumnDefinition> {
        self.columns
            .iter()
            .filter(|c| !c.is_primary_key && !c.is_admin)
            .collect()
    }

    pub fn primary_key(&self) -> Result<&ColumnDefinition, ConfigError> {
        self.primary_key_column()
            .ok_or_else(|| ConfigError::MissingPrimaryKey(self.name.clone()))
    }
}

/// One column as reported by the live storage schema.
#[derive(Clone, Debug, PartialEq)]
pub struct DiscoveredColumn {
    pub name: String,
    pub declared_type: String,
    pub not_null: bool,
    pub default: Option<String>,
    pub is_primary_key: bool,
}

/// What a storage refresh did to one entity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReconcileReport {
    pub kept: Vec<String>,
    pub added: Vec<String>,
    pub dropped: Vec<String>,
}

impl ReconcileReport {
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.dropped.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct SchemaRegistry {
    entities: Vec<Arc<EntitySchema>>,
    by_name: HashMap<String, usize>,
}

impl SchemaRegistry {
    /// Validates the document and indexes it by entity name.
    pub fn from_document(doc: RegistryDocument) -> Result<Self, ConfigError> {
        validate(&doc)?;
        let mut by_name = HashMap::with_capacity(doc.entities.len());
        let mut entities = Vec::with_capacity(doc.entities.len());
        for (i, e) in doc.entities.into_iter().enumerate() {
            by_name.insert(e.name.clone(), i);
            entities.push(Arc::new(e));
        }
        Ok(SchemaRegistry { entities, by_name })
    }

    pub fn get_schema(&self, entity: &str) -> Result<Arc<EntitySchema>, ConfigError> {
        self.by_name
            .get(entity)
            .map(|&i| Arc::clone(&self.entities[i]))
            .ok_or_else(|| ConfigError::SchemaNotFound(entity.to_string()))
    }

    pub fn entities(&self) -> &[Arc<EntitySchema>] {
        &self.entities
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.iter().map(|e| e.name.as_str())
    }

    pub fn visible_columns(
        &self,
        entity: &str,
        include_admin: bool,
    ) -> Result<Vec<ColumnDefinition>, ConfigError> {
        let schema = self.get_schema(entity)?;
        Ok(schema.visible_columns(include_admin).into_iter().cloned().collect())
    }

    pub fn editable_columns(&self, entity: &str) -> Result<Vec<ColumnDefinition>, ConfigError> {
        let schema = self.get_schema(entity)?;
        Ok(schema.editable_columns().into_iter().cloned().collect())
    }

    pub fn primary_key(&self, entity: &str) -> Result<ColumnDefinition, ConfigError> {
        let schema = self.get_schema(entity)?;
        schema.primary_key().cloned()
    }

    pub fn to_document(&self) -> RegistryDocument {
        RegistryDocument {
            entities: self.entities.iter().map(|e| (**e).clone()).collect(),
        }
    }

    /// Rebuilds one entity from storage metadata without losing curated column metadata.
    ///
    /// Columns storage still has keep their display name, default, admin flag and references;
    /// the primary-key flag follows storage. New storage columns are added with their name as
    /// label. Columns storage no longer has are dropped. A result that fails validation (for
    /// example one without a primary key) is rejected and the registry is left untouched.
    pub fn reconcile(
        &mut self,
        entity: &str,
        discovered: &[DiscoveredColumn],
    ) -> Result<ReconcileReport, ConfigError> {
        let current = self.get_schema(entity)?;
        if discovered.is_empty() {
            return Err(ConfigError::Load(format!("table {} not found in storage", entity)));
        }
        let storage_knows_pk = discovered.iter().any(|d| d.is_primary_key);

        let mut report = ReconcileReport::default();
        let mut columns = Vec::with_capacity(discovered.len());
        for d in discovered {
            let column = match current.column(&d.name) {
                Some(curated) => {
                    report.kept.push(d.name.clone());
                    let mut c = curated.clone();
                    if storage_knows_pk {
                        c.is_primary_key = d.is_primary_key;
                    }
                    c
                }
                None => {
                    report.added.push(d.name.clone());
                    let mut c = ColumnDefinition::new(d.name.clone(), DataType::from_declared(&d.declared_type));
                    c.is_primary_key = d.is_primary_key;
                    c.required = d.not_null && !d.is_primary_key && d.default.is_none();
                    c
                }
            };
            columns.push(column);
        }
        report.dropped = current
            .columns
            .iter()
            .filter(|c| !discovered.iter().any(|d| d.name == c.name))
            .map(|c| c.name.clone())
            .collect();

        let unique = current
            .unique
            .iter()
            .filter(|key| key.iter().all(|k| columns.iter().any(|c| &c.name == k)))
            .cloned()
            .collect();
        let candidate = EntitySchema {
            name: current.name.clone(),
            columns,
            unique,
        };
        validate_entity(&candidate)?;

        let mut doc = self.to_document();
        if let Some(slot) = doc.entities.iter_mut().find(|e| e.name == entity) {
            *slot = candidate.clone();
        }
        validate(&doc)?;

        if let Some(&i) = self.by_name.get(entity) {
            self.entities[i] = Arc::new(candidate);
        }
        if !report.is_unchanged() {
            tracing::info!(
                entity = %entity,
                added = ?report.added,
                dropped = ?report.dropped,
                "schema refreshed from storage"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_builtin;

    fn discovered(name: &str, ty: &str, pk: bool) -> DiscoveredColumn {
        DiscoveredColumn {
            name: name.into(),
            declared_type: ty.into(),
            not_null: false,
            default: None,
            is_primary_key: pk,
        }
    }

    #[test]
    fn unknown_entity_is_schema_not_found() {
        let reg = load_builtin().unwrap();
        assert!(matches!(reg.get_schema("Widgets"), Err(ConfigError::SchemaNotFound(n)) if n == "Widgets"));
    }

    #[test]
    fn visible_columns_keep_primary_key_and_drop_admin() {
        let reg = load_builtin().unwrap();
        let cols = reg.visible_columns("Images", false).unwrap();
        let names: Vec<_> = cols.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["ImageID", "ImageFileName"]);

        let all = reg.visible_columns("Images", true).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn editable_columns_exclude_identity_and_admin() {
        let reg = load_builtin().unwrap();
        for schema in reg.entities() {
            for c in reg.editable_columns(&schema.name).unwrap() {
                assert!(!c.is_primary_key, "{}.{}", schema.name, c.name);
                assert!(!c.is_admin, "{}.{}", schema.name, c.name);
            }
        }
    }

    #[test]
    fn reconcile_keeps_curated_metadata_for_known_columns() {
        let mut reg = load_builtin().unwrap();
        let cols = vec![
            discovered("ImageID", "INTEGER", true),
            discovered("ImageFileName", "TEXT", false),
            discovered("Caption", "VARCHAR(80)", false),
        ];
        let report = reg.reconcile("Images", &cols).unwrap();
        assert_eq!(report.added, vec!["Caption"]);
        assert_eq!(report.dropped, vec!["ImageData"]);

        let schema = reg.get_schema("Images").unwrap();
        assert_eq!(schema.column("ImageFileName").unwrap().display_name, "File Name");
        assert_eq!(schema.column("Caption").unwrap().display_name, "Caption");
        assert_eq!(schema.column("Caption").unwrap().data_type, DataType::String);
        assert!(schema.column("ImageData").is_none());
    }

    #[test]
    fn reconcile_without_primary_key_is_rejected() {
        let mut reg = load_builtin().unwrap();
        let cols = vec![discovered("ImageFileName", "TEXT", false)];
        assert!(matches!(
            reg.reconcile("Images", &cols),
            Err(ConfigError::MissingPrimaryKey(_))
        ));
        assert_eq!(reg.get_schema("Images").unwrap().columns.len(), 3);
    }

    #[test]
    fn reconcile_refuses_to_drop_a_referenced_column() {
        let mut reg = load_builtin().unwrap();
        // Suppliers.PartID references Parts.PartID; dropping the pk is a dangling reference.
        let cols = vec![discovered("PartKey", "INTEGER", true), discovered("PartName", "TEXT", false)];
        assert!(reg.reconcile("Parts", &cols).is_err());
        assert!(reg.get_schema("Parts").unwrap().has_column("PartID"));
    }
}
