//! Configuration module for the collector
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use endpoint_collector::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("collector.toml")).unwrap();
//! println!("Collecting {} endpoints", config.endpoints.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AuthConfig, BackoffConfig, CollectorConfig, Config, EndpointEntry, StorageConfig,
};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, compute_config_hash, load_config, load_config_with_hash,
    parse_config, BEARER_ENV_VAR,
};
pub use validation::validate;
