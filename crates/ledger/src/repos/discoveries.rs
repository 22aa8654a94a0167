//! Discovered backup URL repository trait.

use crate::error::LedgerResult;
use async_trait::async_trait;
use time::OffsetDateTime;

/// Repository for backup URLs found in object storage.
#[async_trait]
pub trait DiscoveryRepo: Send + Sync {
    /// Store `urls` for the candidate and set its `checked_at`, atomically.
    ///
    /// An empty `urls` is valid and still marks the candidate checked. Fails
    /// with `NotFound` for an unknown id and `Conflict` if the candidate was
    /// already discovered; nothing is written in either case.
    async fn record_discovery(
        &self,
        candidate_id: i64,
        urls: &[String],
        at: OffsetDateTime,
    ) -> LedgerResult<()>;

    /// Distinct URLs discovered for the candidate. Order is unspecified.
    async fn get_discovered_urls(&self, candidate_id: i64) -> LedgerResult<Vec<String>>;
}
