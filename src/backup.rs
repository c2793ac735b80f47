//! Timestamped file copies of the database.

use crate::error::AppError;
use crate::store::Database;
use chrono::{Local, NaiveDateTime};
use std::path::{Path, PathBuf};

/// `backup_YYYYmmdd_HHMMSS.sqlite`
pub fn backup_file_name(at: NaiveDateTime) -> String {
    format!("backup_{}.sqlite", at.format("%Y%m%d_%H%M%S"))
}

/// Copies the database file into `backup_dir` (created if needed) and returns the copy's path.
/// Holds the connection gate for the duration, so no transaction is open during the copy.
pub async fn backup_database(db: &Database, backup_dir: &Path) -> Result<PathBuf, AppError> {
    let source = db
        .path()
        .ok_or_else(|| AppError::Validation("an in-memory database has no file to back up".into()))?
        .to_path_buf();
    let _guard = db.exclusive()?;
    tokio::fs::create_dir_all(backup_dir).await?;
    let target = backup_dir.join(backup_file_name(Local::now().naive_local()));
    let bytes = tokio::fs::copy(&source, &target).await?;
    tracing::info!(source = %source.display(), target = %target.display(), bytes, "database backed up");
    Ok(target)
}
