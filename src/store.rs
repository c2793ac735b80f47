//! The single SQLite connection and the one-transaction-at-a-time gate in front of it.

use crate::config::{DiscoveredColumn, Settings};
use crate::error::AppError;
use crate::sql::quoted;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
};
use sqlx::{Sqlite, Transaction};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Held for the lifetime of a transaction (or a read); dropping it lets the next operation in.
pub type ConnectionGuard = OwnedMutexGuard<()>;

/// Explicitly constructed storage handle, passed down from the process entry point.
///
/// The pool holds exactly one connection that is never recycled, so an in-memory database
/// lives as long as the handle. Every operation takes the gate first and fails fast with
/// [`AppError::TransactionInProgress`] instead of interleaving with an open transaction.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    gate: Arc<Mutex<()>>,
    path: Option<PathBuf>,
}

impl Database {
    pub async fn connect(settings: &Settings) -> Result<Self, AppError> {
        Self::open(&settings.database_url, settings.enforce_foreign_keys, settings.busy_timeout).await
    }

    /// Opens (creating if missing) the database at `url`.
    pub async fn open(url: &str, enforce_foreign_keys: bool, busy_timeout: Duration) -> Result<Self, AppError> {
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let opts = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(enforce_foreign_keys)
            .journal_mode(SqliteJournalMode::Delete)
            .busy_timeout(busy_timeout);
        let path = if in_memory {
            None
        } else {
            Some(opts.get_filename().to_path_buf())
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;
        tracing::info!(url = %url, foreign_keys = enforce_foreign_keys, "database opened");
        Ok(Database {
            pool,
            gate: Arc::new(Mutex::new(())),
            path,
        })
    }

    /// Private in-memory database, mostly for tests and previews.
    pub async fn in_memory() -> Result<Self, AppError> {
        Self::open("sqlite::memory:", false, Duration::from_millis(5000)).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Database file, or None for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Takes the gate without waiting.
    pub fn exclusive(&self) -> Result<ConnectionGuard, AppError> {
        Arc::clone(&self.gate)
            .try_lock_owned()
            .map_err(|_| AppError::TransactionInProgress)
    }

    /// Takes the gate and opens a transaction on the shared connection.
    pub async fn begin(&self) -> Result<(ConnectionGuard, Transaction<'static, Sqlite>), AppError> {
        let guard = self.exclusive()?;
        let tx = self.pool.begin().await?;
        tracing::debug!("transaction started");
        Ok((guard, tx))
    }

    /// Column metadata of `table` as storage reports it (`PRAGMA table_info`).
    pub async fn introspect_table(&self, table: &str) -> Result<Vec<DiscoveredColumn>, AppError> {
        let _guard = self.exclusive()?;
        let mut conn = self.pool.acquire().await?;
        table_info(&mut conn, table).await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// `PRAGMA table_info` on an already-held connection; an unknown table yields no columns.
pub async fn table_info(conn: &mut SqliteConnection, table: &str) -> Result<Vec<DiscoveredColumn>, AppError> {
    let sql = format!("PRAGMA table_info({})", quoted(table));
    tracing::debug!(sql = %sql, "query");
    let rows = sqlx::query_as::<_, (i64, String, String, i64, Option<String>, i64)>(&sql)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(_cid, name, declared_type, not_null, default, pk)| DiscoveredColumn {
            name,
            declared_type,
            not_null: not_null != 0,
            default,
            is_primary_key: pk != 0,
        })
        .collect())
}
