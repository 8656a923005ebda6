//! Endpoint Collector: a polite JSON endpoint collector
//!
//! This crate fetches JSON payloads from a declared catalog of HTTP endpoints,
//! respecting a per-host request cadence and a concurrency cap, and records
//! every attempt and every parsed payload in an append-only SQLite store.

pub mod collector;
pub mod config;
pub mod endpoint;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for collection runs
///
/// Only setup failures surface here. Per-attempt failures are classified by
/// [`state::AttemptOutcome`] and recorded as rows instead.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while turning an endpoint descriptor into a URL
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("endpoint '{endpoint}': no value for placeholder '{{{param}}}'")]
    MissingParam { endpoint: String, param: String },

    #[error("endpoint '{endpoint}': unclosed placeholder in '{template}'")]
    UnclosedPlaceholder { endpoint: String, template: String },
}

/// Result type alias for collector operations
pub type Result<T> = std::result::Result<T, CollectorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use collector::{run_collection, Coordinator, RunSummary};
pub use config::Config;
pub use endpoint::{build_catalog, resolve_url, EndpointDescriptor, ParamValue};
pub use state::AttemptOutcome;
