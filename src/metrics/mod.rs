//! # Metrics Collection Module
//!
//! Prometheus export and the JSON stats response.
//!
//! ## Metrics Tracked
//!
//! **Counters:**
//! - `conduit_selections_total{backend, strategy}` - Routing decisions
//! - `conduit_outcomes_total{backend, status}` - Recorded outcomes
//!
//! **Histograms:**
//! - `conduit_outcome_duration_seconds{backend}` - Reported operation duration
//!
//! **Gauges:**
//! - `conduit_factor_weight{factor}` - Current learned weight per factor
//! - `conduit_backends_total` - Registered backends
//! - `conduit_backends_lazy` - Backends created by their first outcome
//! - `conduit_profiles_total` - Backends with outcome history
//! - `conduit_active_streams` - Running metrics subscriptions

pub mod handler;
pub mod types;

pub use types::*;

pub use metrics_exporter_prometheus::PrometheusBuilder;

use crate::registry::RegistrationSource;
use crate::service::RouterService;
use std::sync::Arc;
use std::time::Instant;

/// Derives state gauges and the stats response from the router.
pub struct MetricsCollector {
    service: Arc<RouterService>,
    start_time: Instant,
    prometheus_handle: metrics_exporter_prometheus::PrometheusHandle,
}

impl MetricsCollector {
    pub fn new(
        service: Arc<RouterService>,
        start_time: Instant,
        prometheus_handle: metrics_exporter_prometheus::PrometheusHandle,
    ) -> Self {
        Self {
            service,
            start_time,
            prometheus_handle,
        }
    }

    /// Refresh gauges that are derived from current state rather than
    /// updated at the event site.
    pub fn update_gauges(&self) {
        let counts = self.backend_counts();
        metrics::gauge!("conduit_backends_total").set(counts.total as f64);
        metrics::gauge!("conduit_backends_lazy").set(counts.lazy as f64);
        metrics::gauge!("conduit_profiles_total")
            .set(self.service.recorder().profile_count() as f64);
        metrics::gauge!("conduit_active_streams").set(self.service.active_streams() as f64);
    }

    pub fn backend_counts(&self) -> BackendCounts {
        let backends = self.service.list_backends();
        let lazy = backends
            .iter()
            .filter(|b| b.source == RegistrationSource::Lazy)
            .count();
        BackendCounts {
            total: backends.len(),
            manual: backends.len() - lazy,
            lazy,
        }
    }

    pub fn stats(&self) -> StatsResponse {
        let recorder = self.service.recorder();
        StatsResponse {
            uptime_seconds: self.uptime_seconds(),
            backends: self.backend_counts(),
            profiles: recorder.profile_count(),
            outcomes_total: recorder.profiles().iter().map(|p| p.usage_count).sum(),
            weight_updates: self.service.weights().update_count(),
            active_streams: self.service.active_streams(),
            factor_weights: self.service.weights().snapshot().to_map(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Render Prometheus metrics in text format.
    pub fn render_metrics(&self) -> String {
        self.prometheus_handle.render()
    }
}

/// Initialize Prometheus metrics exporter with custom histogram buckets.
///
/// Outcome durations span cached local reads to slow archival writes:
/// [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1, 2.5, 5, 10, 30, 60] seconds.
pub fn setup_metrics(
) -> Result<metrics_exporter_prometheus::PrometheusHandle, Box<dyn std::error::Error>> {
    use metrics_exporter_prometheus::Matcher;

    let duration_buckets = &[
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
    ];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("conduit_outcome_duration_seconds".to_string()),
            duration_buckets,
        )?
        .install_recorder()?;

    Ok(handle)
}

/// Handle for a process that may already have a global recorder installed.
///
/// Falls back to a detached recorder so tests and embedders can build more
/// than one router in the same process.
pub fn prometheus_handle() -> metrics_exporter_prometheus::PrometheusHandle {
    setup_metrics().unwrap_or_else(|e| {
        tracing::debug!("Metrics already initialized, creating new handle: {}", e);
        PrometheusBuilder::new().build_recorder().handle()
    })
}
