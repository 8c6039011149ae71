//! Logging configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing_subscriber::filter::LevelFilter;

/// Modules that accept a level under `[logging.component_levels]`.
pub const LOG_COMPONENTS: &[&str] = &[
    "api",
    "cli",
    "config",
    "insights",
    "metrics",
    "outcomes",
    "registry",
    "scoring",
    "service",
    "streaming",
    "weights",
];

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

/// `[logging]` section.
///
/// ```toml
/// [logging]
/// level = "info"
/// format = "json"
///
/// [logging.component_levels]
/// weights = "debug"   # every weight publish
/// streaming = "trace"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    /// Overrides scoped to `conduit::<component>`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_levels: Option<BTreeMap<String, String>>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            component_levels: None,
        }
    }
}

impl LoggingConfig {
    /// Levels must be plain level names; components must be Conduit modules.
    pub fn validate(&self) -> Result<(), String> {
        parse_level(&self.level)?;
        for (component, level) in self.component_levels.iter().flatten() {
            if !LOG_COMPONENTS.contains(&component.as_str()) {
                return Err(format!(
                    "unknown component '{}' (expected one of: {})",
                    component,
                    LOG_COMPONENTS.join(", ")
                ));
            }
            parse_level(level).map_err(|e| format!("{}: {}", component, e))?;
        }
        Ok(())
    }
}

fn parse_level(level: &str) -> Result<LevelFilter, String> {
    level
        .trim()
        .parse::<LevelFilter>()
        .map_err(|_| format!("invalid log level '{}'", level))
}
