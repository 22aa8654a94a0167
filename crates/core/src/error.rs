//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("missing configuration value: {0}")]
    MissingConfig(String),

    #[error("invalid date '{input}': expected RFC 3339 timestamp or YYYY-MM-DD")]
    InvalidDate { input: String },

    #[error("invalid date window: start {start} is after end {end}")]
    InvalidWindow { start: String, end: String },

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
