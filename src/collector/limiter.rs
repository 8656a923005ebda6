//! Minimum-interval rate limiter
//!
//! One limiter is shared by every collection task of a run. It enforces a
//! global floor on the spacing between request *starts*; it does not attempt
//! fairness between waiters.

use crate::ConfigError;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Shared gate spacing request starts by at least `1 / requests_per_second`
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_release: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter for the given rate
    ///
    /// # Returns
    ///
    /// * `Ok(RateLimiter)` - Rate is finite and strictly positive
    /// * `Err(ConfigError)` - Any other rate
    pub fn new(requests_per_second: f64) -> Result<Self, ConfigError> {
        if !requests_per_second.is_finite() || requests_per_second <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "requests-per-second must be > 0, got {}",
                requests_per_second
            )));
        }

        let min_interval = Duration::try_from_secs_f64(1.0 / requests_per_second).map_err(|_| {
            ConfigError::Validation(format!(
                "requests-per-second {} gives an unrepresentable interval",
                requests_per_second
            ))
        })?;

        Ok(Self {
            min_interval,
            last_release: Mutex::new(None),
        })
    }

    /// Minimum spacing between two releases
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until a request may start
    ///
    /// The check, the sleep and the timestamp update all happen while holding
    /// the lock, so every release is at least `min_interval` after the
    /// previous one. The first call returns immediately.
    pub async fn wait(&self) {
        let mut last_release = self.last_release.lock().await;

        if let Some(previous) = *last_release {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }

        *last_release = Some(Instant::now());
    }
}
