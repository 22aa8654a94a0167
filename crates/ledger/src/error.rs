//! Ledger error types.

use thiserror::Error;

/// Ledger operation errors.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("not found: {0}")]
    NotFound(String),

    /// A candidate was seeded twice or discovered twice.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A write would break the `applied_at => checked_at` ordering.
    #[error("invalid state transition: {0}")]
    InvalidState(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for ledger operations.
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

impl LedgerError {
    /// Map a primary-key violation onto `Conflict`, passing other errors through.
    pub(crate) fn from_insert(err: sqlx::Error, context: impl FnOnce() -> String) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return LedgerError::Conflict(format!("{}: {}", context(), db_err.message()));
        }
        LedgerError::Database(err)
    }
}
