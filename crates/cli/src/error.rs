//! Error taxonomy for the backfill phases.

use backfill_ledger::LedgerError;
use backfill_storage::StorageError;
use backfill_uploads::UploadsError;
use thiserror::Error;

/// Errors that terminate a discover or apply run.
#[derive(Debug, Error)]
pub enum BackfillError {
    /// A required setting is absent or invalid. Raised before any I/O.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The initial datastore connection failed after every retry.
    #[error("connection error: {0}")]
    Connection(#[source] UploadsError),

    /// Apply was pointed at a ledger with nothing in it.
    #[error(
        "ledger contains no candidates; run discover first and pass the \
         ledger it created with --state-db"
    )]
    NoCandidates,

    /// The candidate query against the primary datastore failed.
    #[error("candidate query failed: {0}")]
    Query(#[source] UploadsError),

    /// Listing object storage failed. The candidate stays unchecked.
    #[error("listing {prefix} for candidate {candidate_id} failed: {source}")]
    Listing {
        candidate_id: i64,
        prefix: String,
        #[source]
        source: StorageError,
    },

    /// Writing backup URLs failed. The candidate stays unapplied.
    #[error("updating backup URLs for upload {candidate_id} failed: {source}")]
    Write {
        candidate_id: i64,
        #[source]
        source: UploadsError,
    },

    /// A candidate id was seeded twice, usually a ledger reused across
    /// different date windows.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("ledger error: {0}")]
    Ledger(#[source] LedgerError),
}

/// Result type for backfill phases.
pub type BackfillResult<T> = std::result::Result<T, BackfillError>;

impl From<LedgerError> for BackfillError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Conflict(msg) => BackfillError::Conflict(msg),
            other => BackfillError::Ledger(other),
        }
    }
}

impl From<UploadsError> for BackfillError {
    fn from(err: UploadsError) -> Self {
        match err {
            UploadsError::Config(msg) => BackfillError::Configuration(msg),
            err @ UploadsError::Connection { .. } => BackfillError::Connection(err),
            other => BackfillError::Query(other),
        }
    }
}

impl From<backfill_core::Error> for BackfillError {
    fn from(err: backfill_core::Error) -> Self {
        BackfillError::Configuration(err.to_string())
    }
}

impl From<StorageError> for BackfillError {
    /// Only for constructing a lister; listing failures use [`BackfillError::Listing`].
    fn from(err: StorageError) -> Self {
        BackfillError::Configuration(format!("object storage: {err}"))
    }
}
