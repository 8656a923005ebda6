use crate::config::types::{
    AuthConfig, BackoffConfig, CollectorConfig, Config, EndpointEntry, StorageConfig,
};
use crate::ConfigError;
use reqwest::header::HeaderValue;
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Upper bound on `max-concurrency`
const MAX_CONCURRENCY_LIMIT: u32 = 256;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_collector_config(&config.collector)?;
    validate_backoff_config(&config.backoff)?;
    validate_storage_config(&config.storage)?;
    if let Some(auth) = &config.auth {
        validate_auth_config(auth)?;
    }
    validate_endpoints(&config.endpoints)?;
    Ok(())
}

/// Validates collector configuration
fn validate_collector_config(config: &CollectorConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url '{}': {}", config.base_url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if HeaderValue::from_str(&config.user_agent).is_err() {
        return Err(ConfigError::Validation(format!(
            "user-agent '{}' is not a valid header value",
            config.user_agent
        )));
    }

    if !is_positive(config.timeout_secs) {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be > 0, got {}",
            config.timeout_secs
        )));
    }

    if Duration::try_from_secs_f64(config.timeout_secs).is_err() {
        return Err(ConfigError::Validation(format!(
            "timeout-secs {} is too large",
            config.timeout_secs
        )));
    }

    if config.max_concurrency < 1 || config.max_concurrency > MAX_CONCURRENCY_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max-concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY_LIMIT, config.max_concurrency
        )));
    }

    if !is_positive(config.requests_per_second) {
        return Err(ConfigError::Validation(format!(
            "requests-per-second must be > 0, got {}",
            config.requests_per_second
        )));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    Ok(())
}

/// Validates backoff configuration
fn validate_backoff_config(config: &BackoffConfig) -> Result<(), ConfigError> {
    if !is_positive(config.base_secs) {
        return Err(ConfigError::Validation(format!(
            "backoff base-secs must be > 0, got {}",
            config.base_secs
        )));
    }

    if !config.cap_secs.is_finite() || config.cap_secs < config.base_secs {
        return Err(ConfigError::Validation(format!(
            "backoff cap-secs must be >= base-secs ({}), got {}",
            config.base_secs, config.cap_secs
        )));
    }

    if !(0.0..=1.0).contains(&config.jitter_ratio) {
        return Err(ConfigError::Validation(format!(
            "backoff jitter-ratio must be between 0 and 1, got {}",
            config.jitter_ratio
        )));
    }

    // The longest possible sleep must fit in a Duration
    let longest = config.cap_secs * (1.0 + config.jitter_ratio);
    if Duration::try_from_secs_f64(longest).is_err() {
        return Err(ConfigError::Validation(format!(
            "backoff cap-secs {} with jitter-ratio {} is too large",
            config.cap_secs, config.jitter_ratio
        )));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates the bearer credential
fn validate_auth_config(config: &AuthConfig) -> Result<(), ConfigError> {
    if config.bearer_token.trim().is_empty() {
        return Err(ConfigError::Validation(
            "bearer-token cannot be empty".to_string(),
        ));
    }

    // Only the shape is checked here; the value itself never appears in errors
    if HeaderValue::from_str(&format!("Bearer {}", config.bearer_token)).is_err() {
        return Err(ConfigError::Validation(
            "bearer-token contains characters not allowed in a header".to_string(),
        ));
    }

    Ok(())
}

/// Validates the endpoint catalog entries
fn validate_endpoints(endpoints: &[EndpointEntry]) -> Result<(), ConfigError> {
    if endpoints.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[endpoint]] must be declared".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for entry in endpoints {
        if entry.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "endpoint name cannot be empty".to_string(),
            ));
        }

        if !seen.insert(entry.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate endpoint name '{}'",
                entry.name
            )));
        }

        if entry.path_template.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "endpoint '{}' has an empty path-template",
                entry.name
            )));
        }
    }

    Ok(())
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn create_collector_config() -> CollectorConfig {
        CollectorConfig {
            base_url: "https://api.example.com".to_string(),
            user_agent: "TestCollector/1.0".to_string(),
            timeout_secs: 5.0,
            max_concurrency: 4,
            requests_per_second: 1.0,
            max_retries: 6,
        }
    }

    fn endpoint(name: &str) -> EndpointEntry {
        EndpointEntry {
            name: name.to_string(),
            path_template: "/trending".to_string(),
            params: BTreeMap::new(),
        }
    }

    #[test]
    fn test_valid_collector_config() {
        assert!(validate_collector_config(&create_collector_config()).is_ok());
    }

    #[test]
    fn test_rejects_non_positive_rate() {
        for rate in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let mut config = create_collector_config();
            config.requests_per_second = rate;
            assert!(
                validate_collector_config(&config).is_err(),
                "rate {} should be rejected",
                rate
            );
        }
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let mut config = create_collector_config();
        config.base_url = "not a url".to_string();
        assert!(matches!(
            validate_collector_config(&config),
            Err(ConfigError::InvalidUrl(_))
        ));

        config.base_url = "ftp://files.example.com".to_string();
        assert!(matches!(
            validate_collector_config(&config),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_rejects_concurrency_out_of_range() {
        let mut config = create_collector_config();
        config.max_concurrency = 0;
        assert!(validate_collector_config(&config).is_err());

        config.max_concurrency = MAX_CONCURRENCY_LIMIT + 1;
        assert!(validate_collector_config(&config).is_err());
    }

    #[test]
    fn test_rejects_zero_retries_and_timeout() {
        let mut config = create_collector_config();
        config.max_retries = 0;
        assert!(validate_collector_config(&config).is_err());

        let mut config = create_collector_config();
        config.timeout_secs = 0.0;
        assert!(validate_collector_config(&config).is_err());
    }

    #[test]
    fn test_rejects_unrepresentable_timeout() {
        let mut config = create_collector_config();
        config.timeout_secs = 1e30;
        assert!(matches!(
            validate_collector_config(&config),
            Err(ConfigError::Validation(_))
        ));
        // Accessor saturates rather than panicking
        assert_eq!(config.timeout(), Duration::MAX);

        config.timeout_secs = 86_400.0;
        assert!(validate_collector_config(&config).is_ok());
    }

    #[test]
    fn test_backoff_bounds() {
        assert!(validate_backoff_config(&BackoffConfig::default()).is_ok());

        let cap_below_base = BackoffConfig {
            base_secs: 5.0,
            cap_secs: 1.0,
            jitter_ratio: 0.1,
        };
        assert!(validate_backoff_config(&cap_below_base).is_err());

        let jitter_too_large = BackoffConfig {
            jitter_ratio: 1.5,
            ..BackoffConfig::default()
        };
        assert!(validate_backoff_config(&jitter_too_large).is_err());
    }

    #[test]
    fn test_rejects_unrepresentable_backoff() {
        let huge = BackoffConfig {
            base_secs: 1e20,
            cap_secs: 1e21,
            jitter_ratio: 0.0,
        };
        assert!(validate_backoff_config(&huge).is_err());

        // Cap fits on its own but not once jitter is added
        let cap = Duration::MAX.as_secs_f64() * 0.9;
        let jittered = BackoffConfig {
            base_secs: 1.0,
            cap_secs: cap,
            jitter_ratio: 0.5,
        };
        assert!(validate_backoff_config(&jittered).is_err());
    }

    #[test]
    fn test_endpoint_names_unique_and_present() {
        assert!(validate_endpoints(&[endpoint("a"), endpoint("b")]).is_ok());
        assert!(validate_endpoints(&[]).is_err());
        assert!(validate_endpoints(&[endpoint("a"), endpoint("a")]).is_err());
        assert!(validate_endpoints(&[endpoint(" ")]).is_err());
    }

    #[test]
    fn test_auth_token_shape() {
        let ok = AuthConfig {
            bearer_token: "abc.def-123".to_string(),
        };
        assert!(validate_auth_config(&ok).is_ok());

        let bad = AuthConfig {
            bearer_token: "line\nbreak".to_string(),
        };
        assert!(validate_auth_config(&bad).is_err());
    }
}
