//! Primary datastore repository trait.

use crate::error::UploadsResult;
use async_trait::async_trait;
use backfill_core::{DateWindow, NewCandidate};

/// Access to the `upload` table of the primary datastore.
#[async_trait]
pub trait UploadRepo: Send + Sync {
    /// Uploads in `window` whose `backup_urls` may have been truncated.
    ///
    /// Matches rows modified after creation that hold fewer than two backup
    /// URLs, newest first.
    async fn find_candidates(&self, window: &DateWindow) -> UploadsResult<Vec<NewCandidate>>;

    /// Replace the upload's `backup_urls` with `urls`.
    ///
    /// An empty slice writes an empty array. Returns the number of rows
    /// updated, which is 0 when no upload has this id.
    async fn set_backup_urls(&self, upload_id: i64, urls: &[String]) -> UploadsResult<u64>;
}
