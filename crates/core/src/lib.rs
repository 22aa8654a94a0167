//! Core domain types and shared logic for the backup URL backfill.
//!
//! This crate defines the pieces every other crate agrees on:
//! - Configuration sections for databases, object storage and both phases
//! - The candidate seed type and the object prefix it maps to
//! - The date window used by the candidate query

pub mod candidate;
pub mod config;
pub mod error;
pub mod window;

pub use candidate::{NewCandidate, backup_url, upload_prefix};
pub use error::{Error, Result};
pub use window::{DateWindow, parse_date};

/// Tenant label used for production uploads.
pub const DEFAULT_APP_NAME: &str = "nft";

/// Candidates written per apply batch.
pub const DEFAULT_BATCH_SIZE: u32 = 300;
