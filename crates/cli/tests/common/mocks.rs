use async_trait::async_trait;
use backfill_core::{DateWindow, NewCandidate};
use backfill_ledger::{
    CandidateCounts, CandidateRepo, CandidateRow, DiscoveryRepo, LedgerError, LedgerResult,
    LedgerStore,
};
use backfill_storage::{ContinuationToken, ListingOptions, ListingPage, ObjectLister};
use backfill_storage::{StorageError, StorageResult};
use backfill_uploads::{UploadRepo, UploadsError, UploadsResult};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use time::OffsetDateTime;
use url::Url;

/// In-memory lister that serves at most `page_limit` keys per page, whatever
/// the caller asks for, the way S3 may return short pages.
#[allow(dead_code)]
pub struct PagedMemoryLister {
    keys: Vec<String>,
    base_url: Url,
    page_limit: usize,
    pub calls: AtomicUsize,
    pub tokens_seen: Mutex<Vec<Option<String>>>,
    failing_prefixes: HashSet<String>,
}

#[allow(dead_code)]
impl PagedMemoryLister {
    pub fn new(keys: &[&str]) -> Self {
        let mut keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        keys.sort();
        Self {
            keys,
            base_url: Url::parse("https://dotstorage-prod-0.s3.us-east-2.amazonaws.com/").unwrap(),
            page_limit: usize::MAX,
            calls: AtomicUsize::new(0),
            tokens_seen: Mutex::new(Vec::new()),
            failing_prefixes: HashSet::new(),
        }
    }

    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit;
        self
    }

    /// Fail every listing under `prefix`.
    pub fn failing_on(mut self, prefix: &str) -> Self {
        self.failing_prefixes.insert(prefix.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectLister for PagedMemoryLister {
    async fn list_page(
        &self,
        prefix: &str,
        options: ListingOptions,
        token: Option<ContinuationToken>,
    ) -> StorageResult<ListingPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens_seen
            .lock()
            .unwrap()
            .push(token.as_ref().map(|t| t.as_str().to_string()));

        if self.failing_prefixes.contains(prefix) {
            return Err(StorageError::S3("simulated listing failure".into()));
        }

        let offset = match token {
            Some(t) => t
                .as_str()
                .strip_prefix("offset-")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| StorageError::InvalidContinuationToken(t.into_inner()))?,
            None => 0,
        };

        let matching: Vec<&String> = self.keys.iter().filter(|k| k.starts_with(prefix)).collect();
        let size = options.normalized_page_size().min(self.page_limit);
        let end = (offset + size).min(matching.len());
        let keys = matching[offset..end].iter().map(|k| k.to_string()).collect();
        let next_token =
            (end < matching.len()).then(|| ContinuationToken::new(format!("offset-{end}")));

        Ok(ListingPage { keys, next_token })
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Upload repository that records writes and can fail for chosen ids.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingUploads {
    candidates: Vec<NewCandidate>,
    /// Ids present in the `upload` table. Empty means every id exists.
    known_ids: HashSet<i64>,
    failing_ids: HashSet<i64>,
    pub writes: Mutex<Vec<(i64, Vec<String>)>>,
    pub queries: AtomicUsize,
}

#[allow(dead_code)]
impl RecordingUploads {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candidates(mut self, candidates: Vec<NewCandidate>) -> Self {
        self.known_ids = candidates.iter().map(|c| c.id).collect();
        self.candidates = candidates;
        self
    }

    pub fn failing_on(mut self, id: i64) -> Self {
        self.failing_ids.insert(id);
        self
    }

    pub fn writes(&self) -> Vec<(i64, Vec<String>)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn written_ids(&self) -> Vec<i64> {
        self.writes().into_iter().map(|(id, _)| id).collect()
    }
}

#[async_trait]
impl UploadRepo for RecordingUploads {
    async fn find_candidates(&self, _window: &DateWindow) -> UploadsResult<Vec<NewCandidate>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.candidates.clone())
    }

    async fn set_backup_urls(&self, upload_id: i64, urls: &[String]) -> UploadsResult<u64> {
        if self.failing_ids.contains(&upload_id) {
            return Err(UploadsError::Config(format!(
                "simulated write failure for upload {upload_id}"
            )));
        }
        self.writes
            .lock()
            .unwrap()
            .push((upload_id, urls.to_vec()));

        let exists = self.known_ids.is_empty() || self.known_ids.contains(&upload_id);
        Ok(u64::from(exists))
    }
}

/// Ledger held in memory. Never touches a timer or a blocking thread, so it
/// is safe under a paused tokio clock.
#[allow(dead_code)]
#[derive(Default)]
pub struct MemoryLedger {
    rows: Mutex<BTreeMap<i64, CandidateRow>>,
    urls: Mutex<BTreeMap<i64, Vec<String>>>,
}

#[allow(dead_code)]
impl MemoryLedger {
    /// Ledger whose `ids` are all discovered with one URL each.
    pub fn discovered(ids: impl IntoIterator<Item = i64>) -> Self {
        let ledger = Self::default();
        let at = OffsetDateTime::now_utc();
        for id in ids {
            ledger.rows.lock().unwrap().insert(
                id,
                CandidateRow {
                    id,
                    source_cid: format!("bafy{id}"),
                    user_id: "42".to_string(),
                    checked_at: Some(at),
                    applied_at: None,
                },
            );
            ledger
                .urls
                .lock()
                .unwrap()
                .insert(id, vec![format!("https://x/raw/bafy{id}/nft-42/a")]);
        }
        ledger
    }
}

#[async_trait]
impl CandidateRepo for MemoryLedger {
    async fn add_candidates(&self, candidates: &[NewCandidate]) -> LedgerResult<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(dup) = candidates.iter().find(|c| rows.contains_key(&c.id)) {
            return Err(LedgerError::Conflict(format!("candidate {}", dup.id)));
        }
        for c in candidates {
            rows.insert(
                c.id,
                CandidateRow {
                    id: c.id,
                    source_cid: c.source_cid.clone(),
                    user_id: c.user_id.clone(),
                    checked_at: None,
                    applied_at: None,
                },
            );
        }
        Ok(())
    }

    async fn get_unchecked_candidates(&self) -> LedgerResult<Vec<CandidateRow>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.values().filter(|r| !r.is_checked()).cloned().collect())
    }

    async fn get_backfillable(&self, limit: u32) -> LedgerResult<Vec<CandidateRow>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .values()
            .filter(|r| r.is_checked() && !r.is_applied())
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn get_candidate(&self, candidate_id: i64) -> LedgerResult<Option<CandidateRow>> {
        Ok(self.rows.lock().unwrap().get(&candidate_id).cloned())
    }

    async fn mark_applied(&self, candidate_id: i64, at: OffsetDateTime) -> LedgerResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(&candidate_id)
            .ok_or_else(|| LedgerError::NotFound(format!("candidate {candidate_id}")))?;
        if !row.is_checked() {
            return Err(LedgerError::InvalidState(format!(
                "candidate {candidate_id} cannot be applied before discovery"
            )));
        }
        row.applied_at.get_or_insert(at);
        Ok(())
    }

    async fn get_counts(&self) -> LedgerResult<CandidateCounts> {
        let rows = self.rows.lock().unwrap();
        let count = |f: fn(&CandidateRow) -> bool| rows.values().filter(|r| f(r)).count() as i64;
        Ok(CandidateCounts {
            total: rows.len() as i64,
            checked: count(CandidateRow::is_checked),
            applied: count(CandidateRow::is_applied),
        })
    }
}

#[async_trait]
impl DiscoveryRepo for MemoryLedger {
    async fn record_discovery(
        &self,
        candidate_id: i64,
        urls: &[String],
        at: OffsetDateTime,
    ) -> LedgerResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(&candidate_id)
            .ok_or_else(|| LedgerError::NotFound(format!("candidate {candidate_id}")))?;
        if row.is_checked() {
            return Err(LedgerError::Conflict(format!(
                "candidate {candidate_id} already discovered"
            )));
        }
        row.checked_at = Some(at);
        self.urls
            .lock()
            .unwrap()
            .insert(candidate_id, urls.to_vec());
        Ok(())
    }

    async fn get_discovered_urls(&self, candidate_id: i64) -> LedgerResult<Vec<String>> {
        let mut urls = self
            .urls
            .lock()
            .unwrap()
            .get(&candidate_id)
            .cloned()
            .unwrap_or_default();
        urls.sort();
        urls.dedup();
        Ok(urls)
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn migrate(&self) -> LedgerResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> LedgerResult<()> {
        Ok(())
    }
}
