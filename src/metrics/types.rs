//! # Metrics Types
//!
//! Data structures for the JSON stats response.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// JSON response for GET /v1/stats endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    /// Router uptime in seconds since startup
    pub uptime_seconds: u64,
    pub backends: BackendCounts,
    /// Backends with at least one recorded outcome
    pub profiles: usize,
    /// Outcomes recorded across all backends
    pub outcomes_total: u64,
    /// Weight adaptations applied since startup
    pub weight_updates: u64,
    pub active_streams: usize,
    pub factor_weights: BTreeMap<String, f64>,
}

/// Registered backends by how they were registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendCounts {
    pub total: usize,
    pub manual: usize,
    pub lazy: usize,
}
