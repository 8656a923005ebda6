use crate::config::types::{AuthConfig, Config};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment variable that supplies (or overrides) the bearer credential
pub const BEARER_ENV_VAR: &str = "COLLECTOR_AUTH_BEARER";

/// Loads and parses a configuration file from the given path
///
/// The bearer credential from [`BEARER_ENV_VAR`] is applied before validation.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    let mut config: Config = toml::from_str(&content)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    validate(&config)?;

    Ok(config)
}

/// Parses and validates configuration text without consulting the environment
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Applies environment overrides using the given lookup
///
/// A set, non-blank [`BEARER_ENV_VAR`] replaces any `[auth]` table.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(token) = lookup(BEARER_ENV_VAR) {
        let token = token.trim();
        if !token.is_empty() {
            config.auth = Some(AuthConfig {
                bearer_token: token.to_string(),
            });
        }
    }
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so a set of stored rows can be tied back to the
/// configuration that produced them.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
