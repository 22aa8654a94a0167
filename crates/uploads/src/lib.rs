//! Primary datastore access for the backup URL backfill.
//!
//! Two operations touch the production `upload` table: the candidate query
//! on a read-only handle, and the `backup_urls` correction on a read-write
//! handle. Both go through [`UploadRepo`].

pub mod error;
pub mod postgres;
pub mod repo;

pub use error::{UploadsError, UploadsResult};
pub use postgres::{PostgresUploads, redact_connection_string};
pub use repo::UploadRepo;
