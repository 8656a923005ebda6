//! State module for the fetch state machine
//!
//! # Components
//!
//! - `AttemptOutcome`: classification of one physical HTTP attempt
//!   (success, auth rejected, retryable failure, terminal failure)

mod attempt;

// Re-export main types
pub use attempt::{AttemptOutcome, MAX_ERROR_MESSAGE_CHARS};
