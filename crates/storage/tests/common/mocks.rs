use async_trait::async_trait;
use backfill_storage::error::{StorageError, StorageResult};
use backfill_storage::traits::{ContinuationToken, ListingOptions, ListingPage, ObjectLister};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

/// In-memory lister that serves fixed keys in pages and records every call,
/// so tests can check how the page walk drives continuation tokens.
#[allow(dead_code)]
pub struct PagedMemoryLister {
    keys: Vec<String>,
    base_url: Url,
    pub calls: AtomicUsize,
    pub tokens_seen: Mutex<Vec<Option<String>>>,
    /// Fail the Nth call (0-based) with an S3-style error.
    pub fail_on_call: Option<usize>,
}

#[allow(dead_code)]
impl PagedMemoryLister {
    pub fn new(keys: &[&str]) -> Self {
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            base_url: Url::parse("https://bucket.s3.us-east-1.amazonaws.com/").unwrap(),
            calls: AtomicUsize::new(0),
            tokens_seen: Mutex::new(Vec::new()),
            fail_on_call: None,
        }
    }

    pub fn failing_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
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
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens_seen
            .lock()
            .unwrap()
            .push(token.as_ref().map(|t| t.as_str().to_string()));

        if self.fail_on_call == Some(call) {
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
        let end = (offset + options.normalized_page_size()).min(matching.len());
        let keys = matching[offset..end].iter().map(|k| k.to_string()).collect();
        let next_token = (end < matching.len()).then(|| ContinuationToken::new(format!("offset-{end}")));

        Ok(ListingPage { keys, next_token })
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
