//! Object storage listing for the backup URL backfill.
//!
//! This crate provides:
//! - A paged `ObjectLister` abstraction with continuation tokens
//! - A flat key stream that walks every page of a prefix
//! - Backends: S3-compatible and local filesystem

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::{filesystem::FilesystemBackend, s3::S3Backend};
pub use error::{StorageError, StorageResult};
pub use traits::{
    ContinuationToken, KeyStream, ListingOptions, ListingPage, ObjectLister, ObjectListerExt,
};

use backfill_core::config::StorageConfig;
use std::sync::Arc;

/// Create an object lister from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn ObjectLister>> {
    config.validate()?;

    let lister: Arc<dyn ObjectLister> = match config {
        StorageConfig::Filesystem { path, .. } => {
            Arc::new(FilesystemBackend::new(path, config.base_url()?).await?)
        }
        StorageConfig::S3 { .. } => Arc::new(S3Backend::new(config)?),
    };

    tracing::info!(
        backend = lister.backend_name(),
        base_url = %lister.base_url(),
        "Object storage configured"
    );
    Ok(lister)
}
