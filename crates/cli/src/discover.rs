//! Discovery phase: re-derive every candidate's backup URLs from object storage.

use crate::error::{BackfillError, BackfillResult};
use backfill_core::{DateWindow, backup_url, upload_prefix};
use backfill_ledger::LedgerStore;
use backfill_storage::{ListingOptions, ObjectLister, ObjectListerExt};
use backfill_uploads::UploadRepo;
use futures::TryStreamExt;
use time::OffsetDateTime;

/// Discovery settings.
#[derive(Clone, Debug)]
pub struct DiscoverOptions {
    /// Tenant label in the object prefix.
    pub app_name: String,
    /// Log progress every N candidates. 0 disables progress lines.
    pub log_every: u64,
    pub listing: ListingOptions,
}

impl Default for DiscoverOptions {
    fn default() -> Self {
        Self {
            app_name: backfill_core::DEFAULT_APP_NAME.to_string(),
            log_every: 1000,
            listing: ListingOptions::default(),
        }
    }
}

/// Outcome of one discovery run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Candidates listed and recorded in this run.
    pub checked: u64,
    /// Backup URLs recorded across those candidates.
    pub urls: u64,
}

/// Run the candidate query and seed the ledger with its results.
///
/// Returns the number of candidates seeded. Seeding a ledger that already
/// holds any of these ids fails with [`BackfillError::Conflict`].
pub async fn seed_candidates(
    ledger: &dyn LedgerStore,
    uploads: &dyn UploadRepo,
    window: &DateWindow,
) -> BackfillResult<usize> {
    let candidates = uploads.find_candidates(window).await?;
    tracing::info!(count = candidates.len(), "Found uploads to check");

    ledger.add_candidates(&candidates).await?;
    Ok(candidates.len())
}

/// List every key under `prefix` and qualify each against the lister's base URL.
pub async fn list_backup_urls(
    lister: &dyn ObjectLister,
    prefix: &str,
    options: ListingOptions,
) -> Result<Vec<String>, backfill_storage::StorageError> {
    let keys: Vec<String> = lister.list_keys(prefix, options).try_collect().await?;
    let base = lister.base_url();
    keys.iter()
        .map(|key| {
            backup_url(base, key)
                .map(String::from)
                .map_err(|e| backfill_storage::StorageError::InvalidKey(e.to_string()))
        })
        .collect()
}

/// Discover backup URLs for every unchecked candidate, one at a time.
///
/// Each candidate's URLs and `checked_at` are committed together before the
/// next candidate is listed, so an interrupted run resumes where it stopped.
/// The first listing failure aborts the run and leaves that candidate
/// unchecked.
pub async fn discover_backup_urls(
    ledger: &dyn LedgerStore,
    lister: &dyn ObjectLister,
    options: &DiscoverOptions,
) -> BackfillResult<DiscoveryReport> {
    let unchecked = ledger.get_unchecked_candidates().await?;
    let total = unchecked.len();
    tracing::info!(
        total,
        backend = lister.backend_name(),
        base_url = %lister.base_url(),
        "Checking object storage for backup URLs"
    );

    let mut report = DiscoveryReport::default();
    for candidate in unchecked {
        let prefix = upload_prefix(&candidate.source_cid, &options.app_name, &candidate.user_id);
        let urls = list_backup_urls(lister, &prefix, options.listing)
            .await
            .map_err(|source| BackfillError::Listing {
                candidate_id: candidate.id,
                prefix: prefix.clone(),
                source,
            })?;

        tracing::debug!(
            candidate_id = candidate.id,
            prefix = %prefix,
            urls = urls.len(),
            "Discovered backup URLs"
        );
        ledger
            .record_discovery(candidate.id, &urls, OffsetDateTime::now_utc())
            .await?;

        report.checked += 1;
        report.urls += urls.len() as u64;
        if options.log_every > 0 && report.checked % options.log_every == 0 {
            tracing::info!(checked = report.checked, total, "Discovery progress");
        }
    }

    Ok(report)
}
