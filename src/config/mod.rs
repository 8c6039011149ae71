//! Configuration module for Conduit
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`CONDUIT_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use conduit::config::ConduitConfig;
//!
//! let config = ConduitConfig::default();
//! assert_eq!(config.server.port, 8070);
//!
//! let toml = r#"
//! [outcomes]
//! smoothing_factor = 0.2
//! "#;
//! let config: ConduitConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.outcomes.smoothing_factor, 0.2);
//! ```

pub mod adaptation;
pub mod backend;
pub mod error;
pub mod logging;
pub mod outcomes;
pub mod server;
pub mod service;
pub mod streaming;

pub use adaptation::AdaptationConfig;
pub use backend::BackendConfig;
pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig, LOG_COMPONENTS};
pub use outcomes::OutcomesConfig;
pub use server::ServerConfig;
pub use service::ServiceConfig;
pub use streaming::StreamingConfig;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Unified configuration for the Conduit router.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ConduitConfig {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Rolling outcome statistics
    pub outcomes: OutcomesConfig,
    /// Online factor weight learning
    pub adaptation: AdaptationConfig,
    /// Metrics streaming
    pub streaming: StreamingConfig,
    /// Request deduplication and decision log
    pub service: ServiceConfig,
    /// Backends registered at startup
    pub backends: Vec<BackendConfig>,
}

impl ConduitConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supports CONDUIT_* environment variables for common settings.
    /// Unparseable values are ignored (the previous value is kept).
    pub fn with_env_overrides(mut self) -> Self {
        // Server settings
        if let Ok(port) = std::env::var("CONDUIT_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(host) = std::env::var("CONDUIT_HOST") {
            self.server.host = host;
        }

        // Logging settings
        if let Ok(level) = std::env::var("CONDUIT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("CONDUIT_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }

        // Learning
        if let Ok(rate) = std::env::var("CONDUIT_LEARNING_RATE") {
            if let Ok(r) = rate.parse() {
                self.adaptation.learning_rate = r;
            }
        }
        if let Ok(alpha) = std::env::var("CONDUIT_EMA_ALPHA") {
            if let Ok(a) = alpha.parse() {
                self.outcomes.smoothing_factor = a;
            }
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server.port", "port must be non-zero"));
        }
        self.logging
            .validate()
            .map_err(|e| ConfigError::invalid("logging", e))?;

        let alpha = self.outcomes.smoothing_factor;
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(ConfigError::invalid(
                "outcomes.smoothing_factor",
                format!("must be in (0, 1], got {}", alpha),
            ));
        }
        if self.outcomes.sample_capacity == 0 {
            return Err(ConfigError::invalid(
                "outcomes.sample_capacity",
                "must be at least 1",
            ));
        }
        if self.outcomes.max_content_types == 0 {
            return Err(ConfigError::invalid(
                "outcomes.max_content_types",
                "must be at least 1",
            ));
        }

        self.adaptation
            .settings()
            .validate()
            .map_err(|e| ConfigError::invalid("adaptation", e.to_string()))?;
        self.adaptation
            .initial_weights()
            .map_err(|e| ConfigError::invalid("adaptation.initial_weights", e.to_string()))?;

        let streaming = &self.streaming;
        if streaming.queue_capacity == 0 {
            return Err(ConfigError::invalid(
                "streaming.queue_capacity",
                "must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&streaming.critical_threshold)
            || !(0.0..=1.0).contains(&streaming.warning_threshold)
            || streaming.critical_threshold > streaming.warning_threshold
        {
            return Err(ConfigError::invalid(
                "streaming",
                "thresholds must satisfy 0 <= critical_threshold <= warning_threshold <= 1",
            ));
        }
        if streaming.min_interval_seconds == 0
            || streaming.min_interval_seconds > streaming.max_interval_seconds
        {
            return Err(ConfigError::invalid(
                "streaming.min_interval_seconds",
                "must be non-zero and not exceed max_interval_seconds",
            ));
        }

        if self.service.decision_log_capacity == 0 {
            return Err(ConfigError::invalid(
                "service.decision_log_capacity",
                "must be at least 1",
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for backend in &self.backends {
            let id = backend.id.trim();
            if id.is_empty() {
                return Err(ConfigError::invalid("backends.id", "must not be empty"));
            }
            if !seen.insert(id) {
                return Err(ConfigError::invalid(
                    "backends.id",
                    format!("duplicate backend '{}'", id),
                ));
            }
            backend
                .capabilities
                .validate()
                .map_err(|message| ConfigError::invalid("backends", format!("{}: {}", id, message)))?;
        }

        Ok(())
    }
}
