//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Calculates the sleep before retrying after `attempt` failed
///
/// `min(cap, base * 2^(attempt-1))` plus uniform jitter in
/// `[0, exponential * jitter_ratio)`. The result never exceeds
/// `cap * (1 + jitter_ratio)`.
pub fn compute_backoff(attempt: u32, base_secs: f64, cap_secs: f64, jitter_ratio: f64) -> Duration {
    compute_backoff_with(&mut rand::thread_rng(), attempt, base_secs, cap_secs, jitter_ratio)
}

/// Same as [`compute_backoff`] with a caller-supplied random source
pub fn compute_backoff_with<R: Rng + ?Sized>(
    rng: &mut R,
    attempt: u32,
    base_secs: f64,
    cap_secs: f64,
    jitter_ratio: f64,
) -> Duration {
    let exponent = attempt.saturating_sub(1).min(1023) as i32;
    let exponential = (base_secs * 2f64.powi(exponent)).min(cap_secs);
    let jitter = exponential * jitter_ratio * rng.gen::<f64>();
    let total = exponential + jitter;

    if total.is_nan() || total <= 0.0 {
        return Duration::ZERO;
    }

    // Too large to represent: saturate at the cap, then at Duration::MAX
    Duration::try_from_secs_f64(total)
        .or_else(|_| Duration::try_from_secs_f64(cap_secs))
        .unwrap_or(Duration::MAX)
}
