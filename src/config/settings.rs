//! Process settings read from the environment (`BOM_*` variables).

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://inventory.db";

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    /// Registry document to load instead of the built-in column definitions.
    pub schema_path: Option<PathBuf>,
    pub backup_dir: PathBuf,
    /// SQLite only enforces REFERENCES when asked to; the service checks them either way.
    pub enforce_foreign_keys: bool,
    pub busy_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: DEFAULT_DATABASE_URL.into(),
            schema_path: None,
            backup_dir: PathBuf::from("backups"),
            enforce_foreign_keys: false,
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; unset or unparsable values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();
        let enforce_foreign_keys = match lookup("BOM_ENFORCE_FOREIGN_KEYS") {
            Some(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
            None => defaults.enforce_foreign_keys,
        };
        let busy_timeout = lookup("BOM_BUSY_TIMEOUT_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.busy_timeout);
        Settings {
            database_url: lookup("BOM_DATABASE_URL")
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.database_url),
            schema_path: lookup("BOM_SCHEMA_PATH").filter(|s| !s.is_empty()).map(PathBuf::from),
            backup_dir: lookup("BOM_BACKUP_DIR")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.backup_dir),
            enforce_foreign_keys,
            busy_timeout,
        }
    }
}
