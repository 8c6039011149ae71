//! Query-string shapes and small response bodies of the HTTP surface.

use crate::scoring::RoutingError;
use crate::streaming::{MetricType, StreamRequest};
use serde::{Deserialize, Serialize};

/// Query parameters of `GET /v1/metrics/stream`.
///
/// List parameters are comma-separated:
/// `?update_interval_seconds=2&metrics_types=weights,latency&include_backends=ipfs`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StreamQuery {
    pub update_interval_seconds: Option<u64>,
    pub metrics_types: Option<String>,
    pub include_backends: Option<String>,
    pub include_content_types: Option<String>,
}

impl StreamQuery {
    pub fn into_request(self) -> Result<StreamRequest, RoutingError> {
        let defaults = StreamRequest::default();
        let metrics_types = split_list(self.metrics_types.as_deref())
            .iter()
            .map(|name| {
                name.parse::<MetricType>()
                    .map_err(|e| RoutingError::invalid("metrics_types", e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(StreamRequest {
            update_interval_seconds: self
                .update_interval_seconds
                .unwrap_or(defaults.update_interval_seconds),
            metrics_types,
            include_backends: split_list(self.include_backends.as_deref()),
            include_content_types: split_list(self.include_content_types.as_deref()),
        })
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok`, or `shutting_down` once shutdown has begun
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub backends: usize,
    pub active_streams: usize,
}
