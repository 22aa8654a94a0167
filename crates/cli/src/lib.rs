//! Discovery and apply phases of the backup URL backfill.
//!
//! Each phase receives its ledger and datastore handles as arguments; the
//! `backfill-s3-urls` binary builds them from configuration.

pub mod apply;
pub mod config;
pub mod discover;
pub mod error;

pub use apply::{ApplyOptions, ApplyReport, apply_backup_urls};
pub use discover::{
    DiscoverOptions, DiscoveryReport, discover_backup_urls, list_backup_urls, seed_candidates,
};
pub use error::{BackfillError, BackfillResult};
