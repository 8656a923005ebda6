//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the collector, including:
//! - Building the shared HTTP client (user agent, timeout, bearer credential)
//! - Issuing one GET per attempt and classifying the result
//! - The per-endpoint retry loop with backoff
//! - Recording one outcome row per attempt

use crate::collector::backoff::compute_backoff;
use crate::collector::limiter::RateLimiter;
use crate::config::{AuthConfig, BackoffConfig, CollectorConfig};
use crate::state::AttemptOutcome;
use crate::storage::{RequestOutcome, Storage, StorageResult};
use crate::CollectorError;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Final result of fetching one endpoint
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult {
    /// A 2xx response parsed as JSON
    Success { payload: Value, attempts: u32 },

    /// The server rejected the credentials (401/403); never retried
    AuthRejected { status: u16, attempts: u32 },

    /// No payload. `exhausted` is set when the retry budget ran out on
    /// retryable failures; `error` is the last recorded error.
    TerminalFailure {
        error: String,
        attempts: u32,
        exhausted: bool,
    },
}

impl FetchResult {
    /// Number of physical attempts made (and outcome rows written)
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts, .. }
            | Self::AuthRejected { attempts, .. }
            | Self::TerminalFailure { attempts, .. } => *attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Payload on success
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Success { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

/// Builds the HTTP client shared by every task of a run
///
/// # Arguments
///
/// * `config` - Collector settings (user agent, timeout)
/// * `auth` - Optional bearer credential, sent as `Authorization: Bearer …`
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(CollectorError)` - Invalid header value or client build failure
pub fn build_http_client(
    config: &CollectorConfig,
    auth: Option<&AuthConfig>,
) -> Result<Client, CollectorError> {
    let mut headers = HeaderMap::new();
    if let Some(auth) = auth {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", auth.bearer_token))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    let client = Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .timeout(config.timeout())
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Performs one GET and classifies it
///
/// The body is always read in full, and elapsed time covers the whole
/// exchange up to the last body byte (or the point of failure).
///
/// # Classification
///
/// | Condition | Outcome |
/// |-----------|---------|
/// | HTTP 401/403 | AuthRejected |
/// | HTTP 429, 5xx | RetryableFailure |
/// | Other non-2xx | TerminalFailure |
/// | 2xx, body not JSON | TerminalFailure (`parse_failure:<kind>`) |
/// | 2xx, JSON body | Success |
/// | Timeout, connect, body transfer | RetryableFailure (`network:<kind>`) |
/// | Anything else | TerminalFailure (`unexpected:<kind>:<message>`) |
pub async fn attempt_once(client: &Client, url: &str) -> (AttemptOutcome, u64) {
    let started = Instant::now();

    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => return (classify_transport_error(None, &e), elapsed_ms(started)),
    };

    let status = response.status().as_u16();

    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => return (classify_transport_error(Some(status), &e), elapsed_ms(started)),
    };
    let elapsed = elapsed_ms(started);

    if let Some(outcome) = AttemptOutcome::from_status(status) {
        return (outcome, elapsed);
    }

    let outcome = match serde_json::from_slice::<Value>(&body) {
        Ok(payload) => AttemptOutcome::Success { status, payload },
        Err(e) => AttemptOutcome::parse_failure(status, &e),
    };

    (outcome, elapsed)
}

/// Maps a reqwest error onto the attempt classification
fn classify_transport_error(status: Option<u16>, err: &reqwest::Error) -> AttemptOutcome {
    if err.is_timeout() {
        AttemptOutcome::network(status, "timeout")
    } else if err.is_connect() {
        AttemptOutcome::network(status, "connect")
    } else if err.is_body() {
        AttemptOutcome::network(status, "body")
    } else if err.is_request() {
        AttemptOutcome::network(status, "request")
    } else if err.is_redirect() {
        AttemptOutcome::unexpected(status, "redirect", &err.to_string())
    } else if err.is_decode() {
        AttemptOutcome::unexpected(status, "decode", &err.to_string())
    } else if err.is_builder() {
        AttemptOutcome::unexpected(status, "builder", &err.to_string())
    } else {
        AttemptOutcome::unexpected(status, "other", &err.to_string())
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u64::MAX as u128) as u64
}

/// Runs the per-endpoint attempt loop
///
/// Cheap to clone; every collection task holds its own copy sharing the same
/// client, limiter and storage.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    limiter: Arc<RateLimiter>,
    storage: Arc<dyn Storage>,
    max_retries: u32,
    backoff: BackoffConfig,
}

impl Fetcher {
    pub fn new(
        client: Client,
        limiter: Arc<RateLimiter>,
        storage: Arc<dyn Storage>,
        max_retries: u32,
        backoff: BackoffConfig,
    ) -> Self {
        Self {
            client,
            limiter,
            storage,
            max_retries: max_retries.max(1),
            backoff,
        }
    }

    /// Fetches one endpoint, retrying retryable failures
    ///
    /// Each attempt waits on the shared limiter, performs one GET, and writes
    /// exactly one outcome row before anything else happens. Retryable
    /// failures sleep per the backoff policy before the next attempt; no sleep
    /// follows the final attempt.
    ///
    /// The raw event for a successful payload is not written here.
    ///
    /// # Returns
    ///
    /// * `Ok(FetchResult)` - Terminal state reached (success or not)
    /// * `Err(StorageError)` - An outcome row could not be written
    pub async fn fetch_with_retry(&self, endpoint_name: &str, url: &str) -> StorageResult<FetchResult> {
        let mut last_error = String::new();

        for attempt in 1..=self.max_retries {
            self.limiter.wait().await;

            let (outcome, elapsed_ms) = attempt_once(&self.client, url).await;
            tracing::debug!(
                "{} attempt {}/{}: {} in {}ms",
                endpoint_name,
                attempt,
                self.max_retries,
                outcome,
                elapsed_ms
            );

            let row = RequestOutcome::new(
                endpoint_name,
                url,
                outcome.status(),
                elapsed_ms,
                attempt,
                outcome.error(),
            );
            self.storage.insert_outcome(&row)?;

            match outcome {
                AttemptOutcome::Success { payload, .. } => {
                    return Ok(FetchResult::Success {
                        payload,
                        attempts: attempt,
                    });
                }

                AttemptOutcome::AuthRejected { status } => {
                    tracing::warn!("{}: credentials rejected (HTTP {}), not retrying", endpoint_name, status);
                    return Ok(FetchResult::AuthRejected {
                        status,
                        attempts: attempt,
                    });
                }

                AttemptOutcome::TerminalFailure { error, .. } => {
                    tracing::warn!("{}: {} on attempt {}", endpoint_name, error, attempt);
                    return Ok(FetchResult::TerminalFailure {
                        error,
                        attempts: attempt,
                        exhausted: false,
                    });
                }

                AttemptOutcome::RetryableFailure { error, .. } => {
                    if attempt < self.max_retries {
                        let delay = compute_backoff(
                            attempt,
                            self.backoff.base_secs,
                            self.backoff.cap_secs,
                            self.backoff.jitter_ratio,
                        );
                        tracing::warn!(
                            "{}: {} on attempt {}/{}, retrying in {:?}",
                            endpoint_name,
                            error,
                            attempt,
                            self.max_retries,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = error;
                }
            }
        }

        Ok(FetchResult::TerminalFailure {
            error: last_error,
            attempts: self.max_retries,
            exhausted: true,
        })
    }
}
