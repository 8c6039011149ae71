use crate::registry::RegistrationSource;
use crate::scoring::BackendScore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Narrows an insights snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightsFilter {
    pub backend_id: Option<String>,
    pub content_type: Option<String>,
    /// Only samples this recent; approximate, bounded by the per-backend
    /// sample ring
    pub time_window_hours: Option<u32>,
}

impl InsightsFilter {
    pub fn for_backend(backend_id: impl Into<String>) -> Self {
        Self {
            backend_id: Some(backend_id.into()),
            ..Default::default()
        }
    }

    pub fn for_content_type(content_type: impl Into<String>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            ..Default::default()
        }
    }
}

/// Lifetime counters for one backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    pub usage_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub mean_latency_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<RegistrationSource>,
    pub last_updated: DateTime<Utc>,
}

/// Latency summary over retained samples, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub sample_count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

impl LatencyStats {
    /// Nearest-rank summary; all zeros for no samples.
    pub fn from_samples(mut samples: Vec<f64>) -> Self {
        samples.retain(|v| v.is_finite());
        if samples.is_empty() {
            return Self::default();
        }
        samples.sort_by(f64::total_cmp);

        let n = samples.len();
        let percentile = |p: f64| {
            let rank = ((p / 100.0) * n as f64).ceil() as usize;
            samples[rank.clamp(1, n) - 1]
        };

        Self {
            sample_count: n,
            mean: samples.iter().sum::<f64>() / n as f64,
            min: samples[0],
            max: samples[n - 1],
            p50: percentile(50.0),
            p95: percentile(95.0),
            p99: percentile(99.0),
        }
    }
}

/// Point-in-time view of the router's learned state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightsSnapshot {
    pub factor_weights: BTreeMap<String, f64>,
    pub backend_scores: Vec<BackendScore>,
    pub backend_success_rates: BTreeMap<String, f64>,
    pub content_type_distribution: BTreeMap<String, u64>,
    pub backend_usage_stats: BTreeMap<String, UsageStats>,
    pub latency_stats: LatencyStats,
    pub timestamp: DateTime<Utc>,
}
