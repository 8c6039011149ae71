//! Outcome recording configuration

use serde::{Deserialize, Serialize};

/// Rolling statistics tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutcomesConfig {
    /// EMA smoothing factor α in (0, 1]
    pub smoothing_factor: f64,
    /// Recent outcomes retained per backend for percentiles and windows
    pub sample_capacity: usize,
    /// Distinct content types tallied per backend before the rest fold into `other`
    pub max_content_types: usize,
}

impl Default for OutcomesConfig {
    fn default() -> Self {
        Self {
            smoothing_factor: 0.1,
            sample_capacity: 256,
            max_content_types: 64,
        }
    }
}
