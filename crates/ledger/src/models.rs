//! Database models mapping to the ledger schema.

use sqlx::FromRow;
use time::OffsetDateTime;

/// Candidate upload tracked through discovery and apply.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CandidateRow {
    /// Same as `upload.id` in the primary datastore.
    pub id: i64,
    pub source_cid: String,
    pub user_id: String,
    /// When object storage was listed for this candidate. `None` until discovered.
    pub checked_at: Option<OffsetDateTime>,
    /// When the primary datastore was corrected. `None` until applied.
    pub applied_at: Option<OffsetDateTime>,
}

impl CandidateRow {
    pub fn is_checked(&self) -> bool {
        self.checked_at.is_some()
    }

    pub fn is_applied(&self) -> bool {
        self.applied_at.is_some()
    }
}

/// Aggregate progress counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct CandidateCounts {
    pub total: i64,
    pub checked: i64,
    pub applied: i64,
}

impl CandidateCounts {
    /// Candidates not yet discovered.
    pub fn unchecked(&self) -> i64 {
        self.total - self.checked
    }

    /// Candidates not yet applied, discovered or not.
    pub fn remaining(&self) -> i64 {
        self.total - self.applied
    }
}
