//! Request and response shapes of the router operations.
//!
//! Field names are part of the external contract.

use crate::registry::{Backend, BackendCapabilities};
use crate::scoring::ClientLocation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_strategy() -> String {
    "balanced".to_string()
}

fn default_priority() -> String {
    "normal".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectBackendRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    pub content_type: String,
    /// Signed so that negative sizes reach validation instead of failing
    /// deserialization with a less helpful message
    pub content_size: i64,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default = "default_strategy")]
    pub strategy: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default)]
    pub available_backends: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_location: Option<ClientLocation>,
    /// Generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl SelectBackendRequest {
    pub fn new(content_type: impl Into<String>, content_size: i64) -> Self {
        Self {
            content_hash: None,
            content_type: content_type.into(),
            content_size,
            metadata: BTreeMap::new(),
            strategy: default_strategy(),
            priority: default_priority(),
            available_backends: Vec::new(),
            client_location: None,
            request_id: None,
            timestamp: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeScore {
    pub backend_id: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectBackendResponse {
    pub backend_id: String,
    pub score: f64,
    pub factor_scores: BTreeMap<String, f64>,
    /// Every candidate, best first
    pub alternatives: Vec<AlternativeScore>,
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordOutcomeRequest {
    pub backend_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    pub content_type: String,
    #[serde(default)]
    pub content_size: i64,
    pub duration_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Pairs the outcome with the logged selection and deduplicates retries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Explicit selection-time factor scores; win over the decision log
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factor_scores: Option<BTreeMap<String, f64>>,
}

impl RecordOutcomeRequest {
    pub fn new(backend_id: impl Into<String>, success: bool, duration_ms: f64) -> Self {
        Self {
            backend_id: backend_id.into(),
            success,
            content_hash: None,
            content_type: "application/octet-stream".to_string(),
            content_size: 0,
            duration_ms,
            error: None,
            timestamp: None,
            request_id: None,
            factor_scores: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordOutcomeResponse {
    pub success: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterBackendRequest {
    pub backend_id: String,
    #[serde(default)]
    pub capabilities: BackendCapabilities,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendList {
    pub backends: Vec<Backend>,
}
