// ==========================================
// School Closure - API error type
// ==========================================
// Converts repository and engine errors into caller-facing errors,
// each with an HTTP-like status code
// ==========================================

use crate::engine::ClosureError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // Caller errors (400)
    // ==========================================
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("validation failed: {0}")]
    ValidationError(String),

    #[error("business rule violated: {0}")]
    BusinessRuleViolation(String),

    #[error("school period {period_id} is already closed (closure {closure_id})")]
    PeriodAlreadyClosed { period_id: i64, closure_id: String },

    // ==========================================
    // Lookup errors (404)
    // ==========================================
    #[error("not found: {0}")]
    NotFound(String),

    // ==========================================
    // Data access errors (500)
    // ==========================================
    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("database connection failed: {0}")]
    DatabaseConnectionError(String),

    #[error("database transaction failed: {0}")]
    DatabaseTransactionError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    // ==========================================
    // Generic
    // ==========================================
    #[error("internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// HTTP-like status code of the error
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidInput(_)
            | ApiError::ValidationError(_)
            | ApiError::BusinessRuleViolation(_)
            | ApiError::PeriodAlreadyClosed { .. } => 400,
            ApiError::NotFound(_) => 404,
            ApiError::DatabaseError(_)
            | ApiError::DatabaseConnectionError(_)
            | ApiError::DatabaseTransactionError(_)
            | ApiError::ConfigError(_)
            | ApiError::InternalError(_)
            | ApiError::Other(_) => 500,
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} (id={}) does not exist", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => ApiError::DatabaseTransactionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("database lock failed: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("unique constraint: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("foreign key: {}", msg))
            }
            RepositoryError::BusinessRuleViolation(msg) => ApiError::BusinessRuleViolation(msg),
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InternalError(format!("stored field {} is invalid: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

impl From<ClosureError> for ApiError {
    fn from(err: ClosureError) -> Self {
        match err {
            ClosureError::Repository(e) => e.into(),
            ClosureError::PeriodNotFound(id) => {
                ApiError::InvalidInput(format!("school period {} does not exist", id))
            }
            ClosureError::PeriodAlreadyClosed {
                period_id,
                closure_id,
            } => ApiError::PeriodAlreadyClosed {
                period_id,
                closure_id,
            },
            ClosureError::Config(msg) => ApiError::ConfigError(msg),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::InvalidInput("x".into()).status_code(), 400);
        assert_eq!(
            ApiError::PeriodAlreadyClosed {
                period_id: 1,
                closure_id: "c".into()
            }
            .status_code(),
            400
        );
        assert_eq!(ApiError::NotFound("x".into()).status_code(), 404);
        assert_eq!(ApiError::DatabaseError("x".into()).status_code(), 500);
    }

    #[test]
    fn test_repository_errors_keep_their_class() {
        let not_found: ApiError = RepositoryError::not_found("pending_subject", 7).into();
        assert_eq!(not_found.status_code(), 404);
        assert!(not_found.to_string().contains("pending_subject"));

        let lock: ApiError = RepositoryError::LockError("poisoned".into()).into();
        assert_eq!(lock.status_code(), 500);
    }

    #[test]
    fn test_unknown_period_is_a_caller_error() {
        let err: ApiError = ClosureError::PeriodNotFound(42).into();
        assert_eq!(err.status_code(), 400);
    }
}
