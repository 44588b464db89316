// ==========================================
// School Closure - engine error type
// ==========================================

use thiserror::Error;

use crate::repository::RepositoryError;

#[derive(Error, Debug)]
pub enum ClosureError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("school period {0} not found")]
    PeriodNotFound(i64),

    #[error("school period {period_id} is already closed (closure {closure_id})")]
    PeriodAlreadyClosed { period_id: i64, closure_id: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<rusqlite::Error> for ClosureError {
    fn from(err: rusqlite::Error) -> Self {
        ClosureError::Repository(err.into())
    }
}

pub type EngineResult<T> = Result<T, ClosureError>;
