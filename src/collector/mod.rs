//! Collector module for endpoint fetching
//!
//! This module contains the core collection logic, including:
//! - HTTP fetching with retry logic and outcome classification
//! - Exponential backoff with jitter
//! - Global request rate limiting
//! - Overall collection coordination

mod backoff;
mod coordinator;
mod fetcher;
mod limiter;

pub use backoff::{compute_backoff, compute_backoff_with};
pub use coordinator::{run_collection, Coordinator, RunSummary};
pub use fetcher::{attempt_once, build_http_client, FetchResult, Fetcher};
pub use limiter::RateLimiter;
