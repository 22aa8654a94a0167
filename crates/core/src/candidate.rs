//! Candidate uploads and the object keys that back them.

use crate::error::{Error, Result};
use url::Url;

/// An upload row suspected of having a truncated `backup_urls` field,
/// as returned by the candidate query and seeded into the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewCandidate {
    /// `upload.id` in the primary datastore.
    pub id: i64,
    pub source_cid: String,
    pub user_id: String,
}

impl NewCandidate {
    pub fn new(id: i64, source_cid: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            id,
            source_cid: source_cid.into(),
            user_id: user_id.into(),
        }
    }
}

/// Object-store directory holding every raw CAR chunk of one upload.
///
/// Layout: `raw/{source_cid}/{app_name}-{user_id}/`.
pub fn upload_prefix(source_cid: &str, app_name: &str, user_id: &str) -> String {
    format!("raw/{source_cid}/{app_name}-{user_id}/")
}

/// Qualify a raw object key into an absolute backup URL.
pub fn backup_url(base: &Url, key: &str) -> Result<Url> {
    // A leading "./" keeps a colon in the first segment from parsing as a scheme.
    base.join(&format!("./{}", key.trim_start_matches('/')))
        .map_err(|e| Error::InvalidUrl(format!("{key}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_prefix() {
        assert_eq!(
            upload_prefix("bafybeigdyr", "nft", "42"),
            "raw/bafybeigdyr/nft-42/"
        );
    }

    #[test]
    fn test_backup_url_joins_under_base() {
        let base = Url::parse("https://backups.s3.us-east-2.amazonaws.com/").unwrap();
        let url = backup_url(&base, "raw/bafy/nft-42/a.car").unwrap();
        assert_eq!(
            url.as_str(),
            "https://backups.s3.us-east-2.amazonaws.com/raw/bafy/nft-42/a.car"
        );

        let base = Url::parse("http://localhost:9000/backups/").unwrap();
        let url = backup_url(&base, "raw/bafy/nft-42/b.car").unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/backups/raw/bafy/nft-42/b.car");
    }

    #[test]
    fn test_backup_url_keeps_colons_in_path() {
        let base = Url::parse("http://localhost:9000/backups/").unwrap();
        let url = backup_url(&base, "odd:key/x").unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/backups/odd:key/x");
    }
}
