//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use url::Url;

/// A boxed stream of object keys.
pub type KeyStream<'a> = Pin<Box<dyn Stream<Item = StorageResult<String>> + Send + 'a>>;

/// Page size constraints for listing operations.
///
/// S3 caps `max-keys` at 1000 regardless of what is requested.
pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const MIN_PAGE_SIZE: usize = 1;
pub const MAX_PAGE_SIZE: usize = 1000;

/// An opaque continuation token returned by a truncated listing.
///
/// Backend-specific; callers hand it back unmodified to fetch the next page.
#[derive(Clone, PartialEq, Eq)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Debug for ContinuationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ContinuationToken")
            .field(&"<redacted>")
            .finish()
    }
}

/// A single page of listing results.
#[derive(Clone, Debug, Default)]
pub struct ListingPage {
    /// Object keys in this page.
    pub keys: Vec<String>,

    /// Continuation token for the next page. `None` on the last page.
    pub next_token: Option<ContinuationToken>,
}

/// Options for listing operations.
#[derive(Clone, Copy, Debug)]
pub struct ListingOptions {
    /// Number of keys to request per page, clamped to
    /// [MIN_PAGE_SIZE, MAX_PAGE_SIZE].
    pub page_size: usize,
}

impl ListingOptions {
    pub fn new(page_size: usize) -> Self {
        Self { page_size }
    }

    pub fn normalized_page_size(&self) -> usize {
        self.page_size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE)
    }
}

impl Default for ListingOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Read-only view of an object store: paged key listing plus the base URL
/// that keys resolve against.
#[async_trait]
pub trait ObjectLister: Send + Sync + 'static {
    /// Fetch one page of keys under `prefix`.
    ///
    /// Pass `None` for the first page and the previous page's `next_token`
    /// afterwards. Each call is independent; nothing is retried internally.
    async fn list_page(
        &self,
        prefix: &str,
        options: ListingOptions,
        token: Option<ContinuationToken>,
    ) -> StorageResult<ListingPage>;

    /// Base location keys are qualified against. Always ends in `/`.
    fn base_url(&self) -> &Url;

    /// Static identifier for logs ("s3", "filesystem").
    fn backend_name(&self) -> &'static str;
}

/// Flat key listing over [`ObjectLister::list_page`].
///
/// Automatically implemented for every `ObjectLister`.
pub trait ObjectListerExt: ObjectLister {
    /// Stream every key under `prefix`, walking continuation tokens until
    /// the backend reports the last page.
    ///
    /// Pages are fetched strictly one after another; the walk is a loop, so
    /// arbitrarily long listings do not grow the stack.
    fn list_keys<'a>(&'a self, prefix: &str, options: ListingOptions) -> KeyStream<'a> {
        let prefix = prefix.to_string();
        let stream = async_stream::try_stream! {
            let mut token: Option<ContinuationToken> = None;
            loop {
                let page = self.list_page(&prefix, options, token.take()).await?;
                for key in page.keys {
                    yield key;
                }
                match page.next_token {
                    Some(next) => token = Some(next),
                    None => break,
                }
            }
        };
        Box::pin(stream)
    }
}

impl<T: ObjectLister + ?Sized> ObjectListerExt for T {}
