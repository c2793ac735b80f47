//! Staged writes: the statement has run, the transaction is still open until the caller decides.

use super::crud::{CrudService, SharedRegistry, WriteOutcome};
use crate::error::AppError;
use crate::sql::{compile_fetch, FetchRequest, Record};
use crate::store::ConnectionGuard;
use async_trait::async_trait;
use sqlx::{Sqlite, Transaction};

/// Yes/no question answered by whoever drives the core (a dialog, a CLI flag, a test).
#[async_trait]
pub trait ConfirmationPrompt: Send + Sync {
    async fn confirm(&self, message: &str) -> bool;
}

/// Fixed answer, for headless callers.
pub struct AutoConfirm(pub bool);

#[async_trait]
impl ConfirmationPrompt for AutoConfirm {
    async fn confirm(&self, message: &str) -> bool {
        tracing::debug!(message = %message, answer = self.0, "auto-confirm");
        self.0
    }
}

/// An executed but uncommitted write. Holds the connection gate, so every other
/// operation fails with [`AppError::TransactionInProgress`] until this is committed,
/// rolled back or dropped (dropping rolls back).
pub struct StagedTransaction {
    tx: Transaction<'static, Sqlite>,
    guard: ConnectionGuard,
    registry: SharedRegistry,
    outcome: WriteOutcome,
}

impl StagedTransaction {
    pub(crate) fn new(
        tx: Transaction<'static, Sqlite>,
        guard: ConnectionGuard,
        registry: SharedRegistry,
        outcome: WriteOutcome,
    ) -> Self {
        StagedTransaction {
            tx,
            guard,
            registry,
            outcome,
        }
    }

    pub fn outcome(&self) -> &WriteOutcome {
        &self.outcome
    }

    /// Reads through the open transaction, so the staged change is visible.
    pub async fn preview(&mut self, entity: &str, request: &FetchRequest) -> Result<Vec<Record>, AppError> {
        let schema = CrudService::schema_in(&self.registry, entity)?;
        let q = compile_fetch(&schema, request)?;
        CrudService::query_many(&mut self.tx, &q, &request.filter_values()).await
    }

    pub async fn commit(self) -> Result<WriteOutcome, AppError> {
        let StagedTransaction { tx, guard, outcome, .. } = self;
        tx.commit().await?;
        drop(guard);
        tracing::info!(outcome = %outcome, "committed");
        Ok(outcome)
    }

    pub async fn rollback(self) -> Result<(), AppError> {
        let StagedTransaction { tx, guard, outcome, .. } = self;
        tx.rollback().await?;
        drop(guard);
        tracing::info!(outcome = %outcome, "rolled back");
        Ok(())
    }

    /// Commits on yes, rolls back on no. Returns the outcome only when committed.
    pub async fn finalize(self, prompt: &dyn ConfirmationPrompt) -> Result<Option<WriteOutcome>, AppError> {
        let message = format!("Save changes ({})?", self.outcome);
        if prompt.confirm(&message).await {
            self.commit().await.map(Some)
        } else {
            self.rollback().await?;
            Ok(None)
        }
    }
}

/// Rolls back after a failed operation; the original error is what the caller sees.
pub(crate) async fn rollback_after(tx: Transaction<'static, Sqlite>, cause: &AppError) {
    tracing::warn!(error = %cause, code = cause.code(), "operation failed, rolling back");
    if let Err(e) = tx.rollback().await {
        tracing::error!(error = %e, "rollback failed");
    }
}
