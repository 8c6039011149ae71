//! Router service configuration

use serde::{Deserialize, Serialize};

/// Façade-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Outcomes repeating a request id within this window are ignored
    pub dedup_window_seconds: u64,
    /// Maximum retained decision snapshots keyed by request id
    pub decision_log_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            dedup_window_seconds: 30,
            decision_log_capacity: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_config_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.dedup_window_seconds, 30);
        assert_eq!(config.decision_log_capacity, 10_000);
    }
}
