//! Apply the registry to the database: one table per entity, created if missing.
//! Registry columns that an existing table lacks are added with ALTER TABLE, and each
//! declared unique key gets a unique index.

use crate::config::{ColumnDefinition, DataType, EntitySchema, SchemaRegistry};
use crate::error::AppError;
use crate::sql::quoted;
use crate::store::{table_info, Database};
use serde_json::Value;
use std::collections::HashSet;

/// Creates every registry entity in one transaction. Idempotent.
pub async fn apply_migrations(db: &Database, registry: &SchemaRegistry) -> Result<(), AppError> {
    let (_guard, mut tx) = db.begin().await?;

    for entity in registry.entities() {
        let sql = create_table_sql(entity)?;
        tracing::debug!(sql = %sql, "migration");
        sqlx::query(&sql).execute(&mut *tx).await?;

        let existing: HashSet<String> = table_info(&mut tx, &entity.name)
            .await?
            .into_iter()
            .map(|c| c.name)
            .collect();
        for col in entity.columns.iter().filter(|c| !existing.contains(&c.name)) {
            let sql = format!(
                "ALTER TABLE {} ADD COLUMN {}",
                quoted(&entity.name),
                column_sql(col, false)
            );
            tracing::info!(entity = %entity.name, column = %col.name, "adding missing column");
            sqlx::query(&sql).execute(&mut *tx).await?;
        }

        for sql in unique_index_sql(entity) {
            tracing::debug!(sql = %sql, "migration");
            sqlx::query(&sql).execute(&mut *tx).await?;
        }
    }

    tx.commit().await?;
    tracing::info!(entities = registry.entities().len(), "migrations applied");
    Ok(())
}

/// `CREATE TABLE IF NOT EXISTS` for one entity, columns in schema order.
pub fn create_table_sql(entity: &EntitySchema) -> Result<String, AppError> {
    entity.primary_key()?;
    let col_defs: Vec<String> = entity.columns.iter().map(|c| column_sql(c, true)).collect();
    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        quoted(&entity.name),
        col_defs.join(",\n  ")
    ))
}

/// One `CREATE UNIQUE INDEX IF NOT EXISTS` per unique key. Nullable columns are indexed
/// through IFNULL so that NULLs collide like any other value.
pub fn unique_index_sql(entity: &EntitySchema) -> Vec<String> {
    entity
        .unique
        .iter()
        .enumerate()
        .map(|(i, key)| {
            let cols: Vec<String> = key
                .iter()
                .map(|name| match entity.column(name) {
                    Some(c) if c.required || c.is_primary_key => quoted(name),
                    _ => format!("IFNULL({}, '')", quoted(name)),
                })
                .collect();
            format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({})",
                quoted(&format!("ux_{}_{}", entity.name, i + 1)),
                quoted(&entity.name),
                cols.join(", ")
            )
        })
        .collect()
}

/// ALTER TABLE ADD COLUMN cannot add a key or a NOT NULL column without a default.
fn column_sql(c: &ColumnDefinition, creating: bool) -> String {
    let mut def = format!("{} {}", quoted(&c.name), c.data_type.sql_type());
    if c.is_primary_key && creating {
        def.push_str(" PRIMARY KEY");
        if c.data_type != DataType::Int {
            def.push_str(" NOT NULL");
        }
        return def;
    }
    let default = c.default_value.as_ref().and_then(default_literal);
    if c.required && (creating || default.is_some()) {
        def.push_str(" NOT NULL");
    }
    if let Some(d) = default {
        def.push_str(" DEFAULT ");
        def.push_str(&d);
    }
    if let Some(fk) = c.references.as_ref().filter(|_| c.is_foreign_key) {
        def.push_str(&format!(" REFERENCES {} ({})", quoted(&fk.table), quoted(&fk.column)));
    }
    def
}

fn default_literal(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(format!("'{}'", s.replace('\'', "''"))),
        Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_builtin;
    use serde_json::json;

    #[test]
    fn integer_key_becomes_rowid_alias() {
        let reg = load_builtin().unwrap();
        let sql = create_table_sql(&reg.get_schema("Parts").unwrap()).unwrap();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"Parts\""));
        assert!(sql.contains("\"PartID\" INTEGER PRIMARY KEY,"));
        assert!(sql.contains("\"PartName\" TEXT NOT NULL"));
        assert!(sql.contains("\"ProcurementType\" TEXT DEFAULT 'Purchase'"));
        assert!(sql.contains("\"DrawingID\" INTEGER REFERENCES \"Drawings\" (\"DrawingID\")"));
    }

    #[test]
    fn unique_keys_become_expression_indexes() {
        let reg = load_builtin().unwrap();
        let sql = unique_index_sql(&reg.get_schema("Assemblies_Parts").unwrap());
        assert_eq!(
            sql,
            vec![r#"CREATE UNIQUE INDEX IF NOT EXISTS "ux_Assemblies_Parts_1" ON "Assemblies_Parts" ("ParentAssemblyID", "EntityType", IFNULL("PartID", ''), IFNULL("ChildAssemblyID", ''))"#.to_string()]
        );
        assert!(unique_index_sql(&reg.get_schema("Parts").unwrap()).is_empty());
    }

    #[tokio::test]
    async fn duplicate_link_rows_are_refused_by_storage() {
        let db = Database::in_memory().await.unwrap();
        apply_migrations(&db, &load_builtin().unwrap()).await.unwrap();
        let insert = "INSERT INTO Assemblies_Parts (ParentAssemblyID, EntityType, PartID, Quantity) VALUES (1, 'Part', 5, 1)";
        sqlx::query(insert).execute(db.pool()).await.unwrap();
        assert!(sqlx::query(insert).execute(db.pool()).await.is_err());
        sqlx::query("INSERT INTO Assemblies_Parts (ParentAssemblyID, EntityType, ChildAssemblyID, Quantity) VALUES (1, 'Assembly', 5, 1)")
            .execute(db.pool())
            .await
            .unwrap();
    }

    #[test]
    fn default_literals_are_quoted_by_type() {
        assert_eq!(default_literal(&json!(0)), Some("0".into()));
        assert_eq!(default_literal(&json!(2.5)), Some("2.5".into()));
        assert_eq!(default_literal(&json!("O'Neil")), Some("'O''Neil'".into()));
        assert_eq!(default_literal(&json!(true)), Some("1".into()));
        assert_eq!(default_literal(&Value::Null), None);
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let db = Database::in_memory().await.unwrap();
        let reg = load_builtin().unwrap();
        apply_migrations(&db, &reg).await.unwrap();
        apply_migrations(&db, &reg).await.unwrap();
        for entity in reg.entities() {
            let cols = db.introspect_table(&entity.name).await.unwrap();
            assert_eq!(cols.len(), entity.columns.len(), "{}", entity.name);
        }
    }

    #[tokio::test]
    async fn missing_columns_are_added_to_existing_tables() {
        let db = Database::in_memory().await.unwrap();
        sqlx::query("CREATE TABLE \"Drawings\" (\"DrawingID\" INTEGER PRIMARY KEY, \"DrawingName\" TEXT)")
            .execute(db.pool())
            .await
            .unwrap();
        let reg = load_builtin().unwrap();
        apply_migrations(&db, &reg).await.unwrap();
        let cols = db.introspect_table("Drawings").await.unwrap();
        let expected = reg.get_schema("Drawings").unwrap().columns.len();
        assert_eq!(cols.len(), expected);
    }
}
