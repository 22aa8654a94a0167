//! Primary datastore error types.

use thiserror::Error;

/// Primary datastore errors.
#[derive(Debug, Error)]
pub enum UploadsError {
    /// The initial connection failed on every attempt.
    #[error("failed to connect to {target} after {attempts} attempts: {source}")]
    Connection {
        /// Redacted connection string.
        target: String,
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for primary datastore operations.
pub type UploadsResult<T> = std::result::Result<T, UploadsError>;
