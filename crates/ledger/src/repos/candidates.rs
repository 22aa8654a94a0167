//! Candidate repository trait.

use crate::error::LedgerResult;
use crate::models::{CandidateCounts, CandidateRow};
use async_trait::async_trait;
use backfill_core::NewCandidate;
use time::OffsetDateTime;

/// Rows per `INSERT` when seeding. Three binds per row keeps each statement
/// well under SQLite's 999-parameter limit.
pub const SEED_BATCH_SIZE: usize = 300;

/// Repository for candidate lifecycle tracking.
#[async_trait]
pub trait CandidateRepo: Send + Sync {
    /// Seed new candidates, [`SEED_BATCH_SIZE`] rows per statement.
    ///
    /// All batches commit together. Any id that already exists (in the ledger
    /// or twice in `candidates`) fails the whole call with `Conflict`.
    async fn add_candidates(&self, candidates: &[NewCandidate]) -> LedgerResult<()>;

    /// Candidates whose object storage has not been listed yet. Unordered.
    async fn get_unchecked_candidates(&self) -> LedgerResult<Vec<CandidateRow>>;

    /// Up to `limit` discovered candidates that have not been applied.
    ///
    /// Reflects every earlier `mark_applied` in the same run.
    async fn get_backfillable(&self, limit: u32) -> LedgerResult<Vec<CandidateRow>>;

    /// Get a single candidate.
    async fn get_candidate(&self, candidate_id: i64) -> LedgerResult<Option<CandidateRow>>;

    /// Record that the primary datastore was corrected.
    ///
    /// Idempotent: a second call keeps the first timestamp and succeeds.
    /// Fails with `InvalidState` for a candidate that was never discovered.
    async fn mark_applied(&self, candidate_id: i64, at: OffsetDateTime) -> LedgerResult<()>;

    /// Total, checked and applied counts.
    async fn get_counts(&self) -> LedgerResult<CandidateCounts>;
}
