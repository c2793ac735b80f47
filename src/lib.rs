//! BOM inventory core: schema-driven CRUD and assembly composition over SQLite.

pub mod backup;
pub mod config;
pub mod error;
pub mod migration;
pub mod model;
pub mod service;
pub mod sql;
pub mod store;

pub use backup::backup_database;
pub use config::{load_builtin, load_registry, EntitySchema, SchemaRegistry, Settings};
pub use error::{AppError, ConfigError};
pub use migration::apply_migrations;
pub use model::{CompositionService, ProcurementType};
pub use service::{ConfirmationPrompt, CrudService, Operation, StagedTransaction, WriteOutcome};
pub use sql::{FetchRequest, OrderBy, Record};
pub use store::Database;
