//! Statistics generation from the collection database
//!
//! This module provides functionality for extracting and displaying
//! collection statistics from the storage layer.

use crate::storage::{EndpointCounts, Storage, StorageResult};
use std::fmt::Write;

/// Collection statistics summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionStatistics {
    /// Total number of recorded attempts
    pub total_attempts: u64,

    /// Total number of stored payloads
    pub total_events: u64,

    /// Per-endpoint attempt and payload counts, sorted by endpoint name
    pub endpoints: Vec<EndpointCounts>,

    /// Failed attempts by error class, most frequent first
    pub error_breakdown: Vec<(String, u64)>,
}

impl CollectionStatistics {
    /// Attempts that ended with an error
    pub fn failed_attempts(&self) -> u64 {
        self.error_breakdown.iter().map(|(_, count)| count).sum()
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CollectionStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<CollectionStatistics> {
    Ok(CollectionStatistics {
        total_attempts: storage.count_outcomes()?,
        total_events: storage.count_events()?,
        endpoints: storage.endpoint_breakdown()?,
        error_breakdown: storage.error_breakdown()?,
    })
}

/// Renders statistics as a plain-text report
pub fn format_statistics(stats: &CollectionStatistics) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(out, "=== Collection Statistics ===\n");

    let _ = writeln!(out, "Overview:");
    let _ = writeln!(out, "  Attempts recorded: {}", stats.total_attempts);
    let _ = writeln!(out, "  Payloads stored: {}", stats.total_events);
    let _ = writeln!(out, "  Failed attempts: {}", stats.failed_attempts());
    let _ = writeln!(out);

    if !stats.endpoints.is_empty() {
        let _ = writeln!(out, "Endpoints:");
        let width = stats
            .endpoints
            .iter()
            .map(|e| e.endpoint_name.len())
            .max()
            .unwrap_or(0);
        for endpoint in &stats.endpoints {
            let _ = writeln!(
                out,
                "  {:<width$}  {} attempts, {} ok, {} payloads",
                endpoint.endpoint_name,
                endpoint.attempts,
                endpoint.successful_attempts,
                endpoint.events,
                width = width
            );
        }
        let _ = writeln!(out);
    }

    if !stats.error_breakdown.is_empty() {
        let _ = writeln!(out, "Error Summary:");
        for (class, count) in &stats.error_breakdown {
            let percentage = if stats.total_attempts > 0 {
                (*count as f64 / stats.total_attempts as f64) * 100.0
            } else {
                0.0
            };
            let _ = writeln!(out, "  {}: {} ({:.1}%)", class, count, percentage);
        }
        let _ = writeln!(out);
    }

    let successful = stats.total_attempts.saturating_sub(stats.failed_attempts());
    let success_rate = if stats.total_attempts > 0 {
        (successful as f64 / stats.total_attempts as f64) * 100.0
    } else {
        0.0
    };
    let _ = writeln!(
        out,
        "Success Rate: {:.1}% ({} / {} attempts)",
        success_rate, successful, stats.total_attempts
    );

    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CollectionStatistics) {
    print!("{}", format_statistics(stats));
}
