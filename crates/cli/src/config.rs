//! Configuration loading.
//!
//! Sources, lowest priority first: the optional TOML file, the legacy
//! environment variables of the old scripts, then `BACKFILL_`-prefixed
//! variables (`BACKFILL_STORAGE__BUCKET` sets `storage.bucket`).

use backfill_core::config::AppConfig;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use std::path::Path;

/// Variables read by the old scripts and the keys they set.
pub const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("RO_DATABASE_CONNECTION", "read_database.url"),
    ("DATABASE_CONNECTION", "write_database.url"),
    ("S3_REGION", "storage.region"),
    ("S3_ACCESS_KEY_ID", "storage.access_key_id"),
    ("S3_SECRET_ACCESS_KEY", "storage.secret_access_key"),
    ("S3_BUCKET_NAME", "storage.bucket"),
    ("S3_ENDPOINT", "storage.endpoint"),
];

fn legacy_env() -> Env {
    Env::raw().filter_map(|key| {
        LEGACY_ENV_KEYS
            .iter()
            .find(|(name, _)| key == *name)
            .map(|(_, path)| (*path).into())
    })
}

fn has_legacy_storage_env() -> bool {
    LEGACY_ENV_KEYS
        .iter()
        .filter(|(name, _)| name.starts_with("S3_"))
        .any(|(name, _)| std::env::var_os(name).is_some())
}

/// Build the layered figment. A missing file is not an error.
pub fn figment(config_path: &Path) -> Figment {
    let mut figment = Figment::new();

    if config_path.exists() {
        tracing::info!(config_path = %config_path.display(), "Loading configuration from file");
        figment = figment.merge(Toml::file(config_path));
    } else {
        tracing::debug!("No config file found at {}", config_path.display());
    }

    figment = figment
        .merge(legacy_env())
        .merge(Env::prefixed("BACKFILL_").ignore(&["CONFIG"]).split("__"));

    // Legacy S3_* variables describe an S3 bucket without naming the backend.
    if has_legacy_storage_env() {
        figment = figment.join(Serialized::default("storage.type", "s3"));
    }

    figment
}

/// Load configuration from `config_path` and the environment.
pub fn load(config_path: &Path) -> Result<AppConfig, figment::Error> {
    figment(config_path).extract()
}
