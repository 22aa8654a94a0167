//! Local filesystem storage backend.
//!
//! Treats a directory as a bucket: the object key is the path relative to
//! the root, with `/` separators. Keys are listed in lexicographic order and
//! the continuation token is the last key of the previous page, so paging
//! behaves like S3's `start-after`.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ContinuationToken, ListingOptions, ListingPage, ObjectLister};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::instrument;
use url::Url;

/// Local filesystem object lister.
#[derive(Debug)]
pub struct FilesystemBackend {
    root: PathBuf,
    base_url: Url,
}

impl FilesystemBackend {
    /// Create a new filesystem backend rooted at `root`.
    pub async fn new(root: impl AsRef<Path>, base_url: Url) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root, base_url })
    }

    /// Directory that must be walked to find keys starting with `prefix`.
    ///
    /// A prefix ending in `/` names a directory; otherwise the last segment is
    /// a partial name and its parent is walked.
    fn walk_root(&self, prefix: &str) -> StorageResult<PathBuf> {
        let dir_part = match prefix.rfind('/') {
            Some(idx) => &prefix[..idx],
            None => "",
        };

        let rel = Path::new(dir_part);
        if prefix.starts_with('/')
            || rel
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::InvalidKey(format!(
                "path traversal not allowed: {prefix}"
            )));
        }

        Ok(self.root.join(rel))
    }

    async fn collect_keys(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let base_path = self.walk_root(prefix)?;
        let mut keys = Vec::new();

        match fs::try_exists(&base_path).await {
            Ok(false) => return Ok(keys),
            Ok(true) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(keys),
            Err(e) => return Err(StorageError::Io(e)),
        }

        let mut stack = vec![base_path];
        while let Some(dir) = stack.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                // file_type() does not follow symlinks, so links never escape the root.
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    stack.push(path);
                } else if file_type.is_file()
                    && let Ok(rel) = path.strip_prefix(&self.root)
                {
                    let key = rel
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    if key.starts_with(prefix) {
                        keys.push(key);
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl ObjectLister for FilesystemBackend {
    #[instrument(skip(self, token), fields(backend = "filesystem"))]
    async fn list_page(
        &self,
        prefix: &str,
        options: ListingOptions,
        token: Option<ContinuationToken>,
    ) -> StorageResult<ListingPage> {
        let page_size = options.normalized_page_size();
        let keys = self.collect_keys(prefix).await?;

        let start = match &token {
            Some(after) => {
                if !after.as_str().starts_with(prefix) {
                    return Err(StorageError::InvalidContinuationToken(
                        "token does not belong to this prefix".to_string(),
                    ));
                }
                keys.partition_point(|k| k.as_str() <= after.as_str())
            }
            None => 0,
        };

        let end = (start + page_size).min(keys.len());
        let page: Vec<String> = keys[start..end].to_vec();
        let next_token = if end < keys.len() {
            page.last().cloned().map(ContinuationToken::new)
        } else {
            None
        };

        Ok(ListingPage {
            keys: page,
            next_token,
        })
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}
