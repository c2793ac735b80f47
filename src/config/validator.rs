//! Registry validation: identifiers, primary keys and foreign-key references.

use crate::config::{EntitySchema, RegistryDocument};
use crate::error::ConfigError;
use std::collections::{HashMap, HashSet};

/// Identifiers end up quoted inside generated SQL; keep them to a plain charset.
pub fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Checks one entity in isolation: identifiers, unique columns, exactly one primary key.
pub fn validate_entity(entity: &EntitySchema) -> Result<(), ConfigError> {
    if !is_valid_identifier(&entity.name) {
        return Err(ConfigError::Validation(format!("invalid entity name '{}'", entity.name)));
    }
    let mut names = HashSet::new();
    for c in &entity.columns {
        if !is_valid_identifier(&c.name) {
            return Err(ConfigError::Validation(format!(
                "invalid column name '{}' in {}",
                c.name, entity.name
            )));
        }
        if !names.insert(c.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate column '{}' in {}",
                c.name, entity.name
            )));
        }
        if c.references.is_some() && !c.is_foreign_key {
            return Err(ConfigError::Validation(format!(
                "{}.{} has a reference but is not flagged as a foreign key",
                entity.name, c.name
            )));
        }
        if let Some(pattern) = &c.pattern {
            regex::Regex::new(pattern).map_err(|e| {
                ConfigError::Validation(format!("{}.{} has an invalid pattern: {}", entity.name, c.name, e))
            })?;
        }
    }
    for key in &entity.unique {
        if key.is_empty() {
            return Err(ConfigError::Validation(format!("{} declares an empty unique key", entity.name)));
        }
        if let Some(missing) = key.iter().find(|c| !entity.has_column(c)) {
            return Err(ConfigError::MissingReference {
                kind: "column",
                id: format!("{}.{} (unique key)", entity.name, missing),
            });
        }
    }
    match entity.columns.iter().filter(|c| c.is_primary_key).count() {
        0 => Err(ConfigError::MissingPrimaryKey(entity.name.clone())),
        1 => Ok(()),
        n => Err(ConfigError::Validation(format!(
            "{} declares {} primary keys; exactly one is allowed",
            entity.name, n
        ))),
    }
}

pub fn validate(doc: &RegistryDocument) -> Result<(), ConfigError> {
    let mut by_name: HashMap<&str, &EntitySchema> = HashMap::new();
    for e in &doc.entities {
        validate_entity(e)?;
        if by_name.insert(e.name.as_str(), e).is_some() {
            return Err(ConfigError::Validation(format!("duplicate entity '{}'", e.name)));
        }
    }

    for e in &doc.entities {
        for (col, fk) in e.foreign_keys() {
            let target = by_name.get(fk.table.as_str()).ok_or_else(|| ConfigError::MissingReference {
                kind: "table",
                id: format!("{} (from {}.{})", fk.table, e.name, col.name),
            })?;
            if !target.has_column(&fk.column) {
                return Err(ConfigError::MissingReference {
                    kind: "column",
                    id: format!("{}.{} (from {}.{})", fk.table, fk.column, e.name, col.name),
                });
            }
        }
    }

    Ok(())
}
