use crate::endpoint::ParamValue;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Main configuration structure for the collector
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub collector: CollectorConfig,
    #[serde(default)]
    pub backoff: BackoffConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: Option<AuthConfig>,
    #[serde(rename = "endpoint", default)]
    pub endpoints: Vec<EndpointEntry>,
}

/// HTTP collection behavior
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Base URL every endpoint path is resolved against
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: f64,

    /// Maximum number of in-flight requests
    #[serde(rename = "max-concurrency", default = "default_max_concurrency")]
    pub max_concurrency: u32,

    /// Target request start rate against the host
    #[serde(rename = "requests-per-second", default = "default_requests_per_second")]
    pub requests_per_second: f64,

    /// Maximum attempts per endpoint, including the first one
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,
}

impl CollectorConfig {
    /// Per-request timeout; saturates instead of panicking on values that
    /// validation would reject
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs).unwrap_or(if self.timeout_secs > 0.0 {
            Duration::MAX
        } else {
            Duration::ZERO
        })
    }
}

/// Exponential backoff between retryable attempts
#[derive(Debug, Clone, Deserialize)]
pub struct BackoffConfig {
    #[serde(rename = "base-secs", default = "default_backoff_base")]
    pub base_secs: f64,

    #[serde(rename = "cap-secs", default = "default_backoff_cap")]
    pub cap_secs: f64,

    /// Fraction of the exponential delay added as random jitter
    #[serde(rename = "jitter-ratio", default = "default_jitter_ratio")]
    pub jitter_ratio: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_secs: default_backoff_base(),
            cap_secs: default_backoff_cap(),
            jitter_ratio: default_jitter_ratio(),
        }
    }
}

/// Storage location
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Passive credential forwarding
#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(rename = "bearer-token")]
    pub bearer_token: String,
}

// Keep the token out of logs and dry-run output
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("bearer_token", &"<redacted>")
            .finish()
    }
}

/// One `[[endpoint]]` table
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointEntry {
    pub name: String,

    #[serde(rename = "path-template")]
    pub path_template: String,

    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

fn default_user_agent() -> String {
    format!("endpoint-collector/{} (public-only)", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_secs() -> f64 {
    20.0
}

fn default_max_concurrency() -> u32 {
    4
}

fn default_requests_per_second() -> f64 {
    1.0
}

fn default_max_retries() -> u32 {
    6
}

fn default_backoff_base() -> f64 {
    0.8
}

fn default_backoff_cap() -> f64 {
    30.0
}

fn default_jitter_ratio() -> f64 {
    0.25
}

fn default_database_path() -> String {
    "data/observatory.sqlite".to_string()
}
