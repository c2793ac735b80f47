//! CrudService: registry-driven CRUD over the shared connection, with staged commits.

mod crud;
mod transaction;
mod validation;
pub use crud::{CrudService, Operation, OperationKind, SharedRegistry, WriteOutcome};
pub(crate) use crud::record_into;
pub use transaction::{AutoConfirm, ConfirmationPrompt, StagedTransaction};
pub(crate) use transaction::rollback_after;
pub use validation::{coerce_value, validate_choice, RequestValidator};

/// Service over a fresh in-memory database with the built-in registry applied.
#[cfg(test)]
pub(crate) async fn test_service() -> CrudService {
    let db = crate::store::Database::in_memory().await.unwrap();
    let registry = crate::config::load_builtin().unwrap();
    crate::migration::apply_migrations(&db, &registry).await.unwrap();
    CrudService::new(db, registry)
}
