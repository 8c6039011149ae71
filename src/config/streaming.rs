//! Metrics streaming configuration

use serde::{Deserialize, Serialize};

/// Subscription and status-threshold settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Snapshots younger than this are reused across ticks
    pub coalesce_window_ms: u64,
    /// Per-subscription queue depth; oldest updates are dropped beyond it
    pub queue_capacity: usize,
    /// Aggregate success rate below which status is CRITICAL
    pub critical_threshold: f64,
    /// Aggregate success rate below which status is WARNING
    pub warning_threshold: f64,
    pub min_interval_seconds: u64,
    pub max_interval_seconds: u64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            coalesce_window_ms: 250,
            queue_capacity: 16,
            critical_threshold: 0.5,
            warning_threshold: 0.8,
            min_interval_seconds: 1,
            max_interval_seconds: 3600,
        }
    }
}
