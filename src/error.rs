//! Typed errors and the stable codes the UI shell shows to the user.

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("schema not found: {0}")]
    SchemaNotFound(String),
    #[error("missing primary key: entity {0}")]
    MissingPrimaryKey(String),
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("validation: {0}")]
    Validation(String),
    #[error("invalid sort column: {entity}.{column}")]
    InvalidSortColumn { entity: String, column: String },
    #[error("invalid fetch mode: {0}")]
    InvalidMode(String),
    #[error("foreign key violation: {table}.{column} has no row with value {value}")]
    ForeignKeyViolation {
        table: String,
        column: String,
        value: String,
    },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("a transaction is already in progress")]
    TransactionInProgress,
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Stable snake_case code for display and logging.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config_error",
            AppError::Validation(_) => "validation_error",
            AppError::InvalidSortColumn { .. } => "invalid_sort_column",
            AppError::InvalidMode(_) => "invalid_mode",
            AppError::ForeignKeyViolation { .. } => "foreign_key_violation",
            AppError::NotFound(_) => "not_found",
            AppError::TransactionInProgress => "transaction_in_progress",
            AppError::Db(sqlx::Error::RowNotFound) => "not_found",
            AppError::Db(_) => "database_error",
            AppError::Io(_) => "io_error",
        }
    }

    /// Conditions the user can fix and retry without restarting anything.
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_)
                | AppError::InvalidSortColumn { .. }
                | AppError::InvalidMode(_)
                | AppError::ForeignKeyViolation { .. }
                | AppError::NotFound(_)
                | AppError::TransactionInProgress
        )
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
                recoverable: self.is_user_recoverable(),
            },
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize, Debug)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    pub recoverable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_keep_their_message() {
        let err: AppError = ConfigError::SchemaNotFound("Widgets".into()).into();
        assert_eq!(err.code(), "config_error");
        assert_eq!(err.to_string(), "schema not found: Widgets");
        assert!(!err.is_user_recoverable());
    }

    #[test]
    fn body_carries_code_and_recoverability() {
        let body = AppError::NotFound("Parts 7".into()).to_body();
        assert_eq!(body.error.code, "not_found");
        assert!(body.error.recoverable);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"]["message"], "not found: Parts 7");
    }
}
