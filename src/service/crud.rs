//! Generic CRUD execution against SQLite, driven by the schema registry.

use super::transaction::{rollback_after, ConfirmationPrompt, StagedTransaction};
use super::validation::RequestValidator;
use crate::config::{EntitySchema, ReconcileReport, SchemaRegistry};
use crate::error::AppError;
use crate::sql::{
    bind_all, compile_delete, compile_fetch, compile_fetch_mode, compile_foreign_key_check,
    compile_insert, compile_select_by_id, compile_unique_check, compile_update, row_to_record,
    FetchRequest, QuerySpec, Record,
};
use crate::store::Database;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnection, SqliteQueryResult};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Registry shared between the service and its staged transactions; refresh swaps entities in place.
pub type SharedRegistry = Arc<RwLock<SchemaRegistry>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Add,
    Update,
    Delete,
    Clone,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationKind::Add => "add",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
            OperationKind::Clone => "clone",
        })
    }
}

/// A write to stage. `id` is the primary-key value of the target row.
#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    Add { entity: String, data: Record },
    Update { entity: String, id: Value, data: Record },
    Delete { entity: String, id: Value },
    Clone { entity: String, id: Value },
}

impl Operation {
    pub fn entity(&self) -> &str {
        match self {
            Operation::Add { entity, .. }
            | Operation::Update { entity, .. }
            | Operation::Delete { entity, .. }
            | Operation::Clone { entity, .. } => entity,
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Add { .. } => OperationKind::Add,
            Operation::Update { .. } => OperationKind::Update,
            Operation::Delete { .. } => OperationKind::Delete,
            Operation::Clone { .. } => OperationKind::Clone,
        }
    }
}

/// What a write did. For add and clone, `id` is the new row's identity.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WriteOutcome {
    pub kind: OperationKind,
    pub entity: String,
    pub id: Value,
    pub rows_affected: u64,
}

impl fmt::Display for WriteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.kind, self.entity, self.id)
    }
}

/// Validated and compiled before any transaction is opened.
enum Prepared {
    Insert {
        insert: QuerySpec,
        data: Record,
    },
    Update {
        select: QuerySpec,
        update: QuerySpec,
        id: Value,
        data: Record,
    },
    Delete {
        delete: QuerySpec,
        id: Value,
    },
    Clone {
        select: QuerySpec,
        insert: QuerySpec,
        id: Value,
    },
}

#[derive(Clone)]
pub struct CrudService {
    db: Database,
    registry: SharedRegistry,
}

impl CrudService {
    pub fn new(db: Database, registry: SchemaRegistry) -> Self {
        Self::with_shared_registry(db, Arc::new(RwLock::new(registry)))
    }

    pub fn with_shared_registry(db: Database, registry: SharedRegistry) -> Self {
        CrudService { db, registry }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn registry(&self) -> SharedRegistry {
        Arc::clone(&self.registry)
    }

    /// Current schema snapshot of `entity`.
    pub fn schema(&self, entity: &str) -> Result<Arc<EntitySchema>, AppError> {
        Self::schema_in(&self.registry, entity)
    }

    pub(crate) fn schema_in(registry: &SharedRegistry, entity: &str) -> Result<Arc<EntitySchema>, AppError> {
        let guard = registry.read().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.get_schema(entity)?)
    }

    /// Rows matching the request, columns in schema order.
    pub async fn fetch_all(&self, entity: &str, request: &FetchRequest) -> Result<Vec<Record>, AppError> {
        let schema = self.schema(entity)?;
        let q = compile_fetch(&schema, request)?;
        let _guard = self.db.exclusive()?;
        let mut conn = self.db.pool().acquire().await?;
        Self::query_many(&mut conn, &q, &request.filter_values()).await
    }

    /// Like [`fetch_all`](Self::fetch_all) with an explicit mode name ("Basic", "Where", "Sort", "WhereAndSort").
    pub async fn fetch_mode(&self, entity: &str, mode: &str, request: &FetchRequest) -> Result<Vec<Record>, AppError> {
        let schema = self.schema(entity)?;
        let q = compile_fetch_mode(&schema, mode, request)?;
        let _guard = self.db.exclusive()?;
        let mut conn = self.db.pool().acquire().await?;
        Self::query_many(&mut conn, &q, &request.filter_values()).await
    }

    pub async fn fetch_one(&self, entity: &str, id: &Value, include_admin: bool) -> Result<Option<Record>, AppError> {
        let schema = self.schema(entity)?;
        let q = compile_select_by_id(&schema, include_admin)?;
        let values = Self::id_values(&schema, id)?;
        let _guard = self.db.exclusive()?;
        let mut conn = self.db.pool().acquire().await?;
        Self::query_optional(&mut conn, &q, &values).await
    }

    /// Fetched rows deserialized into a typed view.
    pub async fn fetch_as<T: DeserializeOwned>(&self, entity: &str, request: &FetchRequest) -> Result<Vec<T>, AppError> {
        self.fetch_all(entity, request)
            .await?
            .into_iter()
            .map(|r| record_into(entity, r))
            .collect()
    }

    pub async fn add(&self, entity: &str, data: Record) -> Result<WriteOutcome, AppError> {
        self.stage(Operation::Add {
            entity: entity.to_string(),
            data,
        })
        .await?
        .commit()
        .await
    }

    /// Applies `data` over the current row; NotFound when the row does not exist.
    pub async fn update(&self, entity: &str, id: Value, data: Record) -> Result<WriteOutcome, AppError> {
        self.stage(Operation::Update {
            entity: entity.to_string(),
            id,
            data,
        })
        .await?
        .commit()
        .await
    }

    /// Unconditional delete. Links that point at the row are left alone.
    pub async fn delete(&self, entity: &str, id: Value) -> Result<WriteOutcome, AppError> {
        self.stage(Operation::Delete {
            entity: entity.to_string(),
            id,
        })
        .await?
        .commit()
        .await
    }

    /// Copies every non-admin column of the row into a new row with a fresh identity.
    pub async fn clone_item(&self, entity: &str, id: Value) -> Result<WriteOutcome, AppError> {
        self.stage(Operation::Clone {
            entity: entity.to_string(),
            id,
        })
        .await?
        .commit()
        .await
    }

    /// Asks first; a "no" touches nothing and returns None.
    pub async fn delete_confirmed(
        &self,
        prompt: &dyn ConfirmationPrompt,
        entity: &str,
        id: Value,
    ) -> Result<Option<WriteOutcome>, AppError> {
        let schema = self.schema(entity)?;
        let message = format!("Delete {} {}?", schema.name, id);
        if !prompt.confirm(&message).await {
            tracing::debug!(entity = %entity, id = %id, "delete declined");
            return Ok(None);
        }
        self.delete(entity, id).await.map(Some)
    }

    /// Runs the operation inside a new transaction and leaves it open.
    /// Validation and compilation happen before the transaction starts; a failure after
    /// that rolls the transaction back before the error is returned.
    pub async fn stage(&self, op: Operation) -> Result<StagedTransaction, AppError> {
        let schema = self.schema(op.entity())?;
        let kind = op.kind();
        let prepared = Self::prepare(&schema, op)?;
        let (guard, mut tx) = self.db.begin().await?;
        match Self::apply(&mut tx, &schema, prepared).await {
            Ok((id, rows_affected)) => {
                let outcome = WriteOutcome {
                    kind,
                    entity: schema.name.clone(),
                    id,
                    rows_affected,
                };
                tracing::debug!(outcome = %outcome, "staged");
                Ok(StagedTransaction::new(tx, guard, self.registry(), outcome))
            }
            Err(e) => {
                rollback_after(tx, &e).await;
                Err(e)
            }
        }
    }

    /// Re-reads the entity's columns from storage and reconciles the registry with them.
    pub async fn refresh_from_storage(&self, entity: &str) -> Result<ReconcileReport, AppError> {
        self.schema(entity)?;
        let discovered = self.db.introspect_table(entity).await?;
        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        Ok(registry.reconcile(entity, &discovered)?)
    }

    fn prepare(schema: &EntitySchema, op: Operation) -> Result<Prepared, AppError> {
        Ok(match op {
            Operation::Add { data, .. } => Prepared::Insert {
                insert: compile_insert(schema)?,
                data: RequestValidator::prepare_insert(schema, &data)?,
            },
            Operation::Update { id, data, .. } => Prepared::Update {
                select: compile_select_by_id(schema, false)?,
                update: compile_update(schema)?,
                id: require_id(schema, id)?,
                data: RequestValidator::prepare_update(schema, &data)?,
            },
            Operation::Delete { id, .. } => Prepared::Delete {
                delete: compile_delete(schema)?,
                id: require_id(schema, id)?,
            },
            Operation::Clone { id, .. } => Prepared::Clone {
                select: compile_select_by_id(schema, false)?,
                insert: compile_insert(schema)?,
                id: require_id(schema, id)?,
            },
        })
    }

    /// Returns the affected identity and row count.
    async fn apply(
        conn: &mut SqliteConnection,
        schema: &EntitySchema,
        prepared: Prepared,
    ) -> Result<(Value, u64), AppError> {
        match prepared {
            Prepared::Insert { insert, data } => {
                Self::check_foreign_keys(conn, schema, &data).await?;
                Self::check_unique(conn, schema, &data, false).await?;
                let done = Self::execute(conn, &insert, &data).await?;
                Ok((Value::from(done.last_insert_rowid()), done.rows_affected()))
            }
            Prepared::Update {
                select,
                update,
                id,
                data,
            } => {
                let key = Self::id_values(schema, &id)?;
                let mut merged = Self::query_optional(conn, &select, &key)
                    .await?
                    .ok_or_else(|| not_found(schema, &id))?;
                for (k, v) in &data {
                    merged.insert(k.clone(), v.clone());
                }
                RequestValidator::check_complete(schema, &merged)?;
                Self::check_foreign_keys(conn, schema, &data).await?;
                merged.extend(key);
                Self::check_unique(conn, schema, &merged, true).await?;
                let done = Self::execute(conn, &update, &merged).await?;
                if done.rows_affected() == 0 {
                    return Err(not_found(schema, &id));
                }
                Ok((id, done.rows_affected()))
            }
            Prepared::Delete { delete, id } => {
                let key = Self::id_values(schema, &id)?;
                let done = Self::execute(conn, &delete, &key).await?;
                if done.rows_affected() == 0 {
                    return Err(not_found(schema, &id));
                }
                Ok((id, done.rows_affected()))
            }
            Prepared::Clone { select, insert, id } => {
                let key = Self::id_values(schema, &id)?;
                let source = Self::query_optional(conn, &select, &key)
                    .await?
                    .ok_or_else(|| not_found(schema, &id))?;
                let data = RequestValidator::prepare_insert(schema, &source)?;
                Self::check_foreign_keys(conn, schema, &data).await?;
                Self::check_unique(conn, schema, &data, false).await?;
                let done = Self::execute(conn, &insert, &data).await?;
                Ok((Value::from(done.last_insert_rowid()), done.rows_affected()))
            }
        }
    }

    /// Every non-null foreign-key value in `data` must name an existing row.
    async fn check_foreign_keys(conn: &mut SqliteConnection, schema: &EntitySchema, data: &Record) -> Result<(), AppError> {
        for (col, target) in schema.foreign_keys() {
            let value = match data.get(&col.name) {
                Some(v) if !v.is_null() => v,
                _ => continue,
            };
            let probe = compile_foreign_key_check(target);
            let mut values = Record::new();
            values.insert(target.column.clone(), value.clone());
            if Self::query_optional(conn, &probe, &values).await?.is_none() {
                return Err(AppError::ForeignKeyViolation {
                    table: target.table.clone(),
                    column: target.column.clone(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    /// No other row may share the values of a declared unique key.
    async fn check_unique(
        conn: &mut SqliteConnection,
        schema: &EntitySchema,
        row: &Record,
        exclude_self: bool,
    ) -> Result<(), AppError> {
        for key in &schema.unique {
            let probe = compile_unique_check(schema, key, exclude_self)?;
            if Self::query_optional(conn, &probe, row).await?.is_some() {
                return Err(AppError::Validation(format!(
                    "{} already has a row with the same {}",
                    schema.name,
                    key.join(", ")
                )));
            }
        }
        Ok(())
    }

    fn id_values(schema: &EntitySchema, id: &Value) -> Result<Record, AppError> {
        let pk = schema.primary_key()?;
        let mut values = Record::new();
        values.insert(pk.name.clone(), id.clone());
        Ok(values)
    }

    pub(crate) async fn query_many(
        conn: &mut SqliteConnection,
        q: &QuerySpec,
        values: &Record,
    ) -> Result<Vec<Record>, AppError> {
        let sql = q.positional_sql()?;
        let params = q.bind_values(values);
        tracing::debug!(sql = %sql, params = ?params, "query");
        let rows = bind_all(sqlx::query(&sql), &params).fetch_all(&mut *conn).await?;
        Ok(rows.iter().map(row_to_record).collect())
    }

    pub(crate) async fn query_optional(
        conn: &mut SqliteConnection,
        q: &QuerySpec,
        values: &Record,
    ) -> Result<Option<Record>, AppError> {
        let sql = q.positional_sql()?;
        let params = q.bind_values(values);
        tracing::debug!(sql = %sql, params = ?params, "query");
        let row = bind_all(sqlx::query(&sql), &params).fetch_optional(&mut *conn).await?;
        Ok(row.as_ref().map(row_to_record))
    }

    pub(crate) async fn execute(
        conn: &mut SqliteConnection,
        q: &QuerySpec,
        values: &Record,
    ) -> Result<SqliteQueryResult, AppError> {
        let sql = q.positional_sql()?;
        let params = q.bind_values(values);
        tracing::debug!(sql = %sql, params = ?params, "execute");
        Ok(bind_all(sqlx::query(&sql), &params).execute(&mut *conn).await?)
    }
}

fn require_id(schema: &EntitySchema, id: Value) -> Result<Value, AppError> {
    if id.is_null() {
        return Err(AppError::Validation(format!("{} primary key value is required", schema.name)));
    }
    Ok(id)
}

fn not_found(schema: &EntitySchema, id: &Value) -> AppError {
    AppError::NotFound(format!("{} {}", schema.name, id))
}

pub(crate) fn record_into<T: DeserializeOwned>(entity: &str, record: Record) -> Result<T, AppError> {
    serde_json::from_value(Value::Object(record))
        .map_err(|e| AppError::Validation(format!("unreadable {} row: {}", entity, e)))
}
