//! Output module for reporting on collected data
//!
//! Read-only views over the store: totals, per-endpoint counts and the
//! error-class breakdown shown by `--stats`.

pub mod stats;

pub use stats::{format_statistics, load_statistics, print_statistics, CollectionStatistics};
