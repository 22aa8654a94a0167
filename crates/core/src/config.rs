//! Configuration types shared across crates.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Top-level configuration for both phases.
///
/// Every section is optional at load time; each subcommand asks only for
/// the sections it needs through the `require_*` accessors, so a missing
/// value fails before any I/O happens.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Read-only connection used by the candidate query.
    #[serde(default)]
    pub read_database: Option<DatabaseConfig>,
    /// Read-write connection used by the apply phase.
    #[serde(default)]
    pub write_database: Option<DatabaseConfig>,
    /// Object storage holding the raw uploads.
    #[serde(default)]
    pub storage: Option<StorageConfig>,
    #[serde(default)]
    pub discover: DiscoverConfig,
    #[serde(default)]
    pub apply: ApplyConfig,
}

impl AppConfig {
    pub fn require_read_database(&self) -> Result<&DatabaseConfig> {
        self.read_database
            .as_ref()
            .ok_or_else(|| Error::MissingConfig("read_database.url".to_string()))
    }

    pub fn require_write_database(&self) -> Result<&DatabaseConfig> {
        self.write_database
            .as_ref()
            .ok_or_else(|| Error::MissingConfig("write_database.url".to_string()))
    }

    pub fn require_storage(&self) -> Result<&StorageConfig> {
        let storage = self
            .storage
            .as_ref()
            .ok_or_else(|| Error::MissingConfig("storage".to_string()))?;
        storage.validate()?;
        Ok(storage)
    }
}

/// Primary datastore connection settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string.
    pub url: String,
    /// Maximum connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Attempts made for the initial connection before giving up.
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
}

fn default_max_connections() -> u32 {
    2
}

fn default_connect_attempts() -> u32 {
    5
}

/// Object storage configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// S3-compatible storage.
    S3 {
        /// Bucket name.
        bucket: String,
        /// AWS region.
        region: String,
        /// Optional endpoint URL (for MinIO, etc.). Path-style addressing is
        /// used whenever this is set.
        endpoint: Option<String>,
        /// WARNING: Prefer env vars over storing secrets in config files.
        access_key_id: String,
        /// WARNING: Prefer env vars over storing secrets in config files.
        secret_access_key: String,
        /// Force path-style URLs even without a custom endpoint.
        #[serde(default)]
        force_path_style: bool,
    },
    /// Local directory laid out like the bucket.
    Filesystem {
        /// Root directory standing in for the bucket.
        path: PathBuf,
        /// Base URL used to qualify keys. Defaults to the `file://` URL of `path`.
        base_url: Option<String>,
    },
}

impl StorageConfig {
    /// Validate storage configuration invariants, including that a base URL
    /// can be derived from it.
    pub fn validate(&self) -> Result<()> {
        match self {
            StorageConfig::S3 {
                bucket,
                region,
                access_key_id,
                secret_access_key,
                ..
            } => {
                for (key, value) in [
                    ("storage.bucket", bucket),
                    ("storage.region", region),
                    ("storage.access_key_id", access_key_id),
                    ("storage.secret_access_key", secret_access_key),
                ] {
                    if value.trim().is_empty() {
                        return Err(Error::MissingConfig(key.to_string()));
                    }
                }
            }
            StorageConfig::Filesystem { .. } => {}
        }
        self.base_url()?;
        Ok(())
    }

    /// Endpoint with a scheme, if one is configured.
    ///
    /// Bare `host:port` endpoints (e.g. "minio:9000") get `http://` prepended.
    pub fn normalized_endpoint(&self) -> Option<String> {
        match self {
            StorageConfig::S3 {
                endpoint: Some(endpoint),
                ..
            } => {
                let lower = endpoint.to_ascii_lowercase();
                if lower.starts_with("http://") || lower.starts_with("https://") {
                    Some(endpoint.clone())
                } else {
                    Some(format!("http://{endpoint}"))
                }
            }
            _ => None,
        }
    }

    /// Base location that object keys are resolved against.
    ///
    /// The returned URL always ends in `/`.
    pub fn base_url(&self) -> Result<Url> {
        let raw = match self {
            StorageConfig::S3 { bucket, region, .. } => match self.normalized_endpoint() {
                Some(endpoint) => format!("{}/{}/", endpoint.trim_end_matches('/'), bucket),
                None => format!("https://{bucket}.s3.{region}.amazonaws.com/"),
            },
            StorageConfig::Filesystem {
                base_url: Some(base),
                ..
            } => base.clone(),
            StorageConfig::Filesystem { path, .. } => {
                let absolute = std::path::absolute(path)
                    .map_err(|e| Error::InvalidUrl(format!("{}: {e}", path.display())))?;
                return Url::from_directory_path(&absolute)
                    .map_err(|()| Error::InvalidUrl(absolute.display().to_string()));
            }
        };

        let raw = if raw.ends_with('/') {
            raw
        } else {
            format!("{raw}/")
        };
        Url::parse(&raw).map_err(|e| Error::InvalidUrl(format!("{raw}: {e}")))
    }
}

/// Discovery phase settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiscoverConfig {
    /// Tenant label used in the object prefix (`{app_name}-{user_id}`).
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// Log progress every N candidates.
    #[serde(default = "default_log_every")]
    pub log_every: u64,
}

fn default_app_name() -> String {
    crate::DEFAULT_APP_NAME.to_string()
}

fn default_log_every() -> u64 {
    1000
}

impl Default for DiscoverConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            log_every: default_log_every(),
        }
    }
}

/// Apply phase settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApplyConfig {
    /// Candidates written per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    /// Pause between batches, in seconds.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_batch_size() -> u32 {
    crate::DEFAULT_BATCH_SIZE
}

fn default_interval_secs() -> u64 {
    10
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            interval_secs: default_interval_secs(),
        }
    }
}

impl ApplyConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}
