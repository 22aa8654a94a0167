//! Apply phase: write discovered backup URLs back to the primary datastore.

use crate::error::{BackfillError, BackfillResult};
use backfill_ledger::LedgerStore;
use backfill_uploads::UploadRepo;
use std::time::Duration;
use time::OffsetDateTime;

/// Apply pacing.
#[derive(Clone, Copy, Debug)]
pub struct ApplyOptions {
    /// Candidates written per batch.
    pub batch_size: u32,
    /// Pause between batches.
    pub interval: Duration,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            batch_size: backfill_core::DEFAULT_BATCH_SIZE,
            interval: Duration::from_secs(10),
        }
    }
}

/// Outcome of one apply run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub batches: u64,
    pub applied: u64,
}

/// Replace `backup_urls` for every discovered, unapplied candidate.
///
/// Works in batches of `batch_size` with a fixed pause between them. Stops
/// when a batch comes back empty or every candidate that was unapplied at
/// the start has been handled. A failed write aborts the run before that
/// candidate is marked applied.
pub async fn apply_backup_urls(
    ledger: &dyn LedgerStore,
    uploads: &dyn UploadRepo,
    options: ApplyOptions,
) -> BackfillResult<ApplyReport> {
    if options.batch_size == 0 {
        return Err(BackfillError::Configuration(
            "apply.batch_size must be at least 1".to_string(),
        ));
    }

    let counts = ledger.get_counts().await?;
    if counts.total == 0 {
        return Err(BackfillError::NoCandidates);
    }
    if counts.checked < counts.total {
        tracing::warn!(
            unchecked = counts.unchecked(),
            total = counts.total,
            "Some candidates have not been checked in object storage yet; they will be skipped"
        );
    }

    let target = u64::try_from(counts.remaining()).unwrap_or_default();
    let mut report = ApplyReport::default();

    while report.applied < target {
        let batch = ledger.get_backfillable(options.batch_size).await?;
        if batch.is_empty() {
            break;
        }
        report.batches += 1;
        tracing::info!(
            batch = report.batches,
            size = batch.len(),
            applied = report.applied,
            remaining = target - report.applied,
            total = counts.total,
            "Applying batch"
        );

        for candidate in batch {
            let urls = ledger.get_discovered_urls(candidate.id).await?;
            let updated = uploads
                .set_backup_urls(candidate.id, &urls)
                .await
                .map_err(|source| BackfillError::Write {
                    candidate_id: candidate.id,
                    source,
                })?;
            if updated == 0 {
                tracing::warn!(
                    candidate_id = candidate.id,
                    "No upload row matched; marking applied anyway"
                );
            }

            ledger
                .mark_applied(candidate.id, OffsetDateTime::now_utc())
                .await?;
            report.applied += 1;
        }

        if report.applied < target && !options.interval.is_zero() {
            tokio::time::sleep(options.interval).await;
        }
    }

    Ok(report)
}
