use crate::insights::{LatencyStats, Sections, UsageStats};
use crate::scoring::BackendScore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// A section a subscriber can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    Weights,
    SuccessRates,
    Latency,
    Usage,
    ContentTypes,
    Scores,
}

impl MetricType {
    pub const ALL: [MetricType; 6] = [
        MetricType::Weights,
        MetricType::SuccessRates,
        MetricType::Latency,
        MetricType::Usage,
        MetricType::ContentTypes,
        MetricType::Scores,
    ];

    pub(crate) fn sections(types: &[MetricType]) -> Sections {
        let mut sections = Sections::NONE;
        for kind in types {
            match kind {
                MetricType::Weights => sections.weights = true,
                MetricType::SuccessRates => sections.success_rates = true,
                MetricType::Latency => sections.latency = true,
                MetricType::Usage => sections.usage = true,
                MetricType::ContentTypes => sections.content_types = true,
                MetricType::Scores => sections.scores = true,
            }
        }
        sections
    }
}

impl FromStr for MetricType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weights" | "factor_weights" => Ok(MetricType::Weights),
            "success_rates" => Ok(MetricType::SuccessRates),
            "latency" => Ok(MetricType::Latency),
            "usage" => Ok(MetricType::Usage),
            "content_types" => Ok(MetricType::ContentTypes),
            "scores" => Ok(MetricType::Scores),
            _ => Err(format!("Unknown metric type: {}", s)),
        }
    }
}

/// What a subscriber wants to receive, and how often.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamRequest {
    pub update_interval_seconds: u64,
    /// Empty means every metric type
    pub metrics_types: Vec<MetricType>,
    /// Empty means every backend
    pub include_backends: Vec<String>,
    /// Narrows `content_type_distribution` only. Success rates, usage,
    /// latency and scores are per-backend figures and ignore this list.
    /// Empty means every content type.
    pub include_content_types: Vec<String>,
}

impl Default for StreamRequest {
    fn default() -> Self {
        Self {
            update_interval_seconds: 5,
            metrics_types: Vec::new(),
            include_backends: Vec::new(),
            include_content_types: Vec::new(),
        }
    }
}

impl StreamRequest {
    pub(crate) fn effective_types(&self) -> Vec<MetricType> {
        if self.metrics_types.is_empty() {
            MetricType::ALL.to_vec()
        } else {
            self.metrics_types.clone()
        }
    }
}

/// Coarse health derived from the aggregate success rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemStatus {
    Normal,
    Warning,
    Critical,
}

impl SystemStatus {
    /// No data counts as normal.
    pub fn classify(aggregate: Option<f64>, critical_below: f64, warning_below: f64) -> Self {
        match aggregate {
            Some(rate) if rate < critical_below => SystemStatus::Critical,
            Some(rate) if rate < warning_below => SystemStatus::Warning,
            _ => SystemStatus::Normal,
        }
    }
}

/// The sections of one update. Only requested sections are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factor_weights: Option<BTreeMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_success_rates: Option<BTreeMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_stats: Option<LatencyStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_usage_stats: Option<BTreeMap<String, UsageStats>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type_distribution: Option<BTreeMap<String, u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_scores: Option<Vec<BackendScore>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate_success_rate: Option<f64>,
}

/// One periodic update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsUpdate {
    /// 1-based, per subscription
    pub sequence: u64,
    pub metrics: MetricsPayload,
    pub status: SystemStatus,
    pub timestamp: DateTime<Utc>,
}

/// Why a subscription ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// The subscriber asked to stop
    Cancelled,
    /// The router is shutting down
    Shutdown,
}

/// An item of a metrics subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Update(MetricsUpdate),
    /// Terminal; nothing follows it
    Closed { reason: CloseReason },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Closed { .. })
    }
}
