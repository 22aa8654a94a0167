//! Recovery ledger for the backup URL backfill.
//!
//! The ledger bridges discovery and apply and is what makes both resumable:
//! - Candidate rows seeded once from the primary datastore
//! - Backup URLs found in object storage, written with `checked_at`
//! - `applied_at` once the primary datastore has been corrected

pub mod error;
pub mod models;
pub mod repos;
pub mod store;

pub use error::{LedgerError, LedgerResult};
pub use models::{CandidateCounts, CandidateRow};
pub use repos::{CandidateRepo, DiscoveryRepo};
pub use store::{LedgerStore, SqliteLedger};
